//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` for strings (null when the field is absent), boxed slices
//! handed out as pointer plus length, and tagged enums with explicit
//! discriminants. Absent numbers are reported as `-1`. Conversions live here
//! so `lib.rs` stays focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use freesound_core::{
    ApiError, FilterField, FreesoundClient, HttpMethod, HttpRequest, Page, SortParameter,
    SoundDetail, SoundSummary, User,
};

/// Opaque handle to a `FreesoundClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiClient {
    pub(crate) inner: FreesoundClient,
}

// ---------------------------------------------------------------------------
// Allocation helpers
// ---------------------------------------------------------------------------

/// Heap C string. Interior NULs are dropped rather than failing.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let mut s = s.into();
    s.retain(|c| c != '\0');
    CString::new(s).unwrap_or_default().into_raw()
}

pub(crate) fn c_string_opt(s: Option<String>) -> *mut c_char {
    s.map_or(std::ptr::null_mut(), c_string)
}

/// Release a string produced by `c_string`. Null is ignored.
pub(crate) unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Hand out `items` as a pointer plus length; null when empty.
pub(crate) fn into_raw_slice<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    let ptr = Box::into_raw(items.into_boxed_slice()) as *mut T;
    (ptr, len)
}

/// Reclaim a slice produced by `into_raw_slice`.
pub(crate) unsafe fn from_raw_slice<T>(ptr: *mut T, len: u32) -> Box<[T]> {
    if ptr.is_null() || len == 0 {
        return Box::default();
    }
    unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len as usize)) }
}

fn tags_to_c(tags: Vec<String>) -> (*mut *mut c_char, u32) {
    into_raw_slice(tags.into_iter().map(c_string).collect())
}

unsafe fn free_tags(tags: *mut *mut c_char, len: u32) {
    for tag in unsafe { from_raw_slice(tags, len) }.iter() {
        unsafe { free_c_string(*tag) };
    }
}

fn count_or_minus_one(value: Option<u64>) -> i64 {
    value.and_then(|v| i64::try_from(v).ok()).unwrap_or(-1)
}

// ---------------------------------------------------------------------------
// Search parameters
// ---------------------------------------------------------------------------

/// Sort code accepted by `fs_build_search`: `-1` none, `0` relevance,
/// `1` duration, `2` rating, `3` downloads.
pub(crate) fn sort_from_code(code: i32) -> Result<Option<SortParameter>, FfiError> {
    match code {
        -1 => Ok(None),
        0 => Ok(Some(SortParameter::Relevance)),
        1 => Ok(Some(SortParameter::Duration)),
        2 => Ok(Some(SortParameter::Rating)),
        3 => Ok(Some(SortParameter::Downloads)),
        _ => Err(FfiError::invalid_arg(format!("unknown sort code {code}"))),
    }
}

/// Filter code accepted by `fs_build_search`: `-1` none, `0` username,
/// `1` tag, `2` description, `3` comment.
pub(crate) fn filter_from_code(code: i32) -> Result<Option<FilterField>, FfiError> {
    match code {
        -1 => Ok(None),
        0 => Ok(Some(FilterField::Username)),
        1 => Ok(Some(FilterField::Tag)),
        2 => Ok(Some(FilterField::Description)),
        3 => Ok(Some(FilterField::Comment)),
        _ => Err(FfiError::invalid_arg(format!("unknown filter code {code}"))),
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `fs_build_*` functions. The C caller executes the request and
/// passes the response back through `fs_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let headers = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: c_string(k),
                value: c_string(v),
            })
            .collect();
        let (headers, headers_len) = into_raw_slice(headers);
        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: c_string(req.url),
            headers,
            headers_len,
        }))
    }

    pub(crate) unsafe fn free(ptr: *mut Self) {
        let req = unsafe { Box::from_raw(ptr) };
        unsafe { free_c_string(req.url) };
        for header in unsafe { from_raw_slice(req.headers, req.headers_len) }.iter() {
            unsafe {
                free_c_string(header.key);
                free_c_string(header.value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this after executing a request and passes a
/// pointer to an `fs_parse_*` function. The FFI layer reads but does not
/// free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct FfiSoundSummary {
    /// `-1` when the server omitted it.
    pub id: i64,
    pub name: *mut c_char,
    pub username: *mut c_char,
    pub kind: *mut c_char,
    pub num_downloads: i64,
    /// Seconds; negative when absent.
    pub duration: f64,
    pub tags: *mut *mut c_char,
    pub tags_len: u32,
}

impl FfiSoundSummary {
    fn from_core(sound: SoundSummary) -> Self {
        let (tags, tags_len) = tags_to_c(sound.tags);
        Self {
            id: count_or_minus_one(sound.id),
            name: c_string(sound.name),
            username: c_string(sound.username),
            kind: c_string_opt(sound.kind),
            num_downloads: count_or_minus_one(sound.num_downloads),
            duration: sound.duration.unwrap_or(-1.0),
            tags,
            tags_len,
        }
    }

    unsafe fn free_fields(&self) {
        unsafe {
            free_c_string(self.name);
            free_c_string(self.username);
            free_c_string(self.kind);
            free_tags(self.tags, self.tags_len);
        }
    }
}

#[repr(C)]
pub struct FfiSoundPage {
    pub count: u64,
    pub next: *mut c_char,
    pub previous: *mut c_char,
    pub items: *mut FfiSoundSummary,
    pub len: u32,
}

#[repr(C)]
pub struct FfiSoundDetail {
    pub id: u64,
    pub name: *mut c_char,
    pub username: *mut c_char,
    pub url: *mut c_char,
    pub description: *mut c_char,
    pub license: *mut c_char,
    pub created: *mut c_char,
    pub kind: *mut c_char,
    pub duration: f64,
    pub filesize: i64,
    pub num_downloads: i64,
    /// Negative when absent.
    pub avg_rating: f64,
    pub tags: *mut *mut c_char,
    pub tags_len: u32,
    pub preview_hq_mp3: *mut c_char,
    pub preview_lq_mp3: *mut c_char,
    pub preview_hq_ogg: *mut c_char,
    pub preview_lq_ogg: *mut c_char,
}

impl FfiSoundDetail {
    fn from_core(sound: SoundDetail) -> Self {
        let (tags, tags_len) = tags_to_c(sound.tags);
        let previews = sound.previews.unwrap_or_default();
        Self {
            id: sound.id,
            name: c_string(sound.name),
            username: c_string(sound.username),
            url: c_string_opt(sound.url),
            description: c_string_opt(sound.description),
            license: c_string_opt(sound.license),
            created: c_string_opt(sound.created),
            kind: c_string_opt(sound.kind),
            duration: sound.duration.unwrap_or(-1.0),
            filesize: count_or_minus_one(sound.filesize),
            num_downloads: count_or_minus_one(sound.num_downloads),
            avg_rating: sound.avg_rating.unwrap_or(-1.0),
            tags,
            tags_len,
            preview_hq_mp3: c_string_opt(previews.preview_hq_mp3),
            preview_lq_mp3: c_string_opt(previews.preview_lq_mp3),
            preview_hq_ogg: c_string_opt(previews.preview_hq_ogg),
            preview_lq_ogg: c_string_opt(previews.preview_lq_ogg),
        }
    }

    unsafe fn free_fields(&self) {
        unsafe {
            for s in [
                self.name,
                self.username,
                self.url,
                self.description,
                self.license,
                self.created,
                self.kind,
                self.preview_hq_mp3,
                self.preview_lq_mp3,
                self.preview_hq_ogg,
                self.preview_lq_ogg,
            ] {
                free_c_string(s);
            }
            free_tags(self.tags, self.tags_len);
        }
    }
}

#[repr(C)]
pub struct FfiUser {
    pub username: *mut c_char,
    pub url: *mut c_char,
    pub about: *mut c_char,
    pub home_page: *mut c_char,
    pub avatar_small: *mut c_char,
    pub avatar_medium: *mut c_char,
    pub avatar_large: *mut c_char,
    pub date_joined: *mut c_char,
    pub num_sounds: i64,
}

impl FfiUser {
    fn from_core(user: User) -> Self {
        let avatar = user.avatar.unwrap_or_default();
        Self {
            username: c_string(user.username),
            url: c_string_opt(user.url),
            about: c_string_opt(user.about),
            home_page: c_string_opt(user.home_page),
            avatar_small: c_string_opt(avatar.small),
            avatar_medium: c_string_opt(avatar.medium),
            avatar_large: c_string_opt(avatar.large),
            date_joined: c_string_opt(user.date_joined),
            num_sounds: count_or_minus_one(user.num_sounds),
        }
    }

    unsafe fn free_fields(&self) {
        for s in [
            self.username,
            self.url,
            self.about,
            self.home_page,
            self.avatar_small,
            self.avatar_medium,
            self.avatar_large,
            self.date_joined,
        ] {
            unsafe { free_c_string(s) };
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NullArg = 1,
    Config = 2,
    Transport = 3,
    ServerStatus = 4,
    Decode = 5,
    Panic = 6,
    InvalidArg = 7,
}

/// Error category, message and server status, before it is handed to C.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FfiError {
    pub code: FfiErrorCode,
    pub message: String,
    pub http_status: u16,
}

impl FfiError {
    pub(crate) fn new(code: FfiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: 0,
        }
    }

    pub(crate) fn null_arg(name: &str) -> Self {
        Self::new(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_arg(message: impl Into<String>) -> Self {
        Self::new(FfiErrorCode::InvalidArg, message)
    }

    pub(crate) fn panic(op: &str) -> Self {
        Self::new(FfiErrorCode::Panic, format!("panic in {op}"))
    }
}

impl From<ApiError> for FfiError {
    fn from(err: ApiError) -> Self {
        let (code, http_status) = match &err {
            ApiError::Config(_) => (FfiErrorCode::Config, 0),
            ApiError::Transport(_) => (FfiErrorCode::Transport, 0),
            ApiError::ServerStatus { code, .. } => (FfiErrorCode::ServerStatus, *code),
            ApiError::Decode(_) => (FfiErrorCode::Decode, 0),
        };
        Self {
            code,
            message: err.to_string(),
            http_status,
        }
    }
}

/// Tag that tells `fs_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    SoundPage = 1,
    SoundDetail = 2,
    User = 3,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload named by `data_tag`. On failure `error_code` gives
/// the category, `error_message` is a C string, `http_status` carries the
/// server status for `ServerStatus`, and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    pub(crate) fn failure(err: FfiError) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: err.code,
            error_message: c_string(err.message),
            http_status: err.http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn ok_sound_page(page: Page<SoundSummary>) -> *mut Self {
        let items = page.results.into_iter().map(FfiSoundSummary::from_core).collect();
        let (items, len) = into_raw_slice(items);
        let page = Box::new(FfiSoundPage {
            count: page.count,
            next: c_string_opt(page.next),
            previous: c_string_opt(page.previous),
            items,
            len,
        });
        Self::ok(FfiDataTag::SoundPage, Box::into_raw(page) as *mut c_void)
    }

    pub(crate) fn ok_sound_detail(sound: SoundDetail) -> *mut Self {
        let detail = Box::new(FfiSoundDetail::from_core(sound));
        Self::ok(FfiDataTag::SoundDetail, Box::into_raw(detail) as *mut c_void)
    }

    pub(crate) fn ok_user(user: User) -> *mut Self {
        let user = Box::new(FfiUser::from_core(user));
        Self::ok(FfiDataTag::User, Box::into_raw(user) as *mut c_void)
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        Self::failure(err.into())
    }

    pub(crate) unsafe fn free(ptr: *mut Self) {
        let result = unsafe { Box::from_raw(ptr) };
        unsafe { free_c_string(result.error_message) };
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::SoundPage => {
                let page = unsafe { Box::from_raw(result.data as *mut FfiSoundPage) };
                unsafe {
                    free_c_string(page.next);
                    free_c_string(page.previous);
                    for item in from_raw_slice(page.items, page.len).iter() {
                        item.free_fields();
                    }
                }
            }
            FfiDataTag::SoundDetail => {
                let detail = unsafe { Box::from_raw(result.data as *mut FfiSoundDetail) };
                unsafe { detail.free_fields() };
            }
            FfiDataTag::User => {
                let user = unsafe { Box::from_raw(result.data as *mut FfiUser) };
                unsafe { user.free_fields() };
            }
            FfiDataTag::None => {}
        }
    }
}
