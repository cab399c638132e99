//! C-ABI wrapper around `freesound-core`.
//!
//! # Overview
//! Exposes the Freesound browse API through `extern "C"` functions so a host
//! with a C FFI (a mobile shell, typically) can build requests and parse
//! responses while keeping the HTTP exchange on its own networking stack.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `fs_build_*` / `fs_parse_*` mirror the core client 1:1. A builder that
//!   fails returns null and records why in a thread-local slot read through
//!   `fs_last_error_code` and `fs_last_error_message`.
//! - A single `FfiResult` envelope with `FfiDataTag` + `void* data` carries
//!   success payloads and errors uniformly.
//! - The C caller owns every returned pointer and releases it with the
//!   matching `fs_free_*` function.

pub mod types;

use std::cell::RefCell;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, UnwindSafe};

use freesound_core::{ClientConfig, Credentials, FreesoundClient, HttpRequest, HttpResponse, SearchQuery};

use types::*;

thread_local! {
    static LAST_ERROR: RefCell<Option<FfiError>> = const { RefCell::new(None) };
}

fn set_last_error(err: FfiError) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Borrow a C string as `&str`. `None` for null or non-UTF-8 input.
fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Like `str_arg`, but says which argument was missing or malformed.
fn required_str<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, FfiError> {
    if ptr.is_null() {
        return Err(FfiError::null_arg(name));
    }
    str_arg(ptr).ok_or_else(|| FfiError::invalid_arg(format!("{name} is not valid UTF-8")))
}

/// Shared null check, panic guard and error bookkeeping for every
/// `fs_build_*` function. On failure the request is null and the reason is
/// left for `fs_last_error_code` / `fs_last_error_message`.
fn build_with<F>(client: *const FfiClient, op: &'static str, build: F) -> *mut FfiHttpRequest
where
    F: FnOnce(&FreesoundClient) -> Result<HttpRequest, FfiError> + UnwindSafe,
{
    clear_last_error();
    let outcome = catch_unwind(|| {
        if client.is_null() {
            return Err(FfiError::null_arg("client"));
        }
        build(&unsafe { &*client }.inner)
    })
    .unwrap_or_else(|_| Err(FfiError::panic(op)));
    match outcome {
        Ok(req) => FfiHttpRequest::from_core(req),
        Err(err) => {
            set_last_error(err);
            std::ptr::null_mut()
        }
    }
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url`.
///
/// `client_id` and `client_secret` may be null, in which case requests that
/// need authentication cannot be built. `page_size` of 0 selects the
/// default. Returns null if `base_url` is null or not UTF-8; the reason is
/// available from `fs_last_error_message`.
/// Free the returned pointer with `fs_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fs_client_new(
    base_url: *const c_char,
    client_id: *const c_char,
    client_secret: *const c_char,
    page_size: u32,
) -> *mut FfiClient {
    clear_last_error();
    let outcome = catch_unwind(|| -> Result<FreesoundClient, FfiError> {
        let url = required_str(base_url, "base_url")?;
        let mut config = ClientConfig::new(url);
        if let (Some(id), Some(secret)) = (str_arg(client_id), str_arg(client_secret)) {
            config = config.with_credentials(Credentials::new(id, secret));
        }
        if page_size > 0 {
            config = config.with_page_size(page_size);
        }
        Ok(FreesoundClient::with_config(&config))
    })
    .unwrap_or_else(|_| Err(FfiError::panic("fs_client_new")));
    match outcome {
        Ok(inner) => Box::into_raw(Box::new(FfiClient { inner })),
        Err(err) => {
            set_last_error(err);
            std::ptr::null_mut()
        }
    }
}

/// Free a client created by `fs_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fs_client_free(client: *mut FfiClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Error reporting
// ---------------------------------------------------------------------------

/// Category of the last failed `fs_client_new` / `fs_build_*` call on this
/// thread, or `Ok` if the last such call succeeded.
#[unsafe(no_mangle)]
pub extern "C" fn fs_last_error_code() -> FfiErrorCode {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(FfiErrorCode::Ok, |e| e.code))
}

/// Message of the last failed `fs_client_new` / `fs_build_*` call on this
/// thread, or null. Free the returned copy with `fs_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fs_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|slot| c_string_opt(slot.borrow().as_ref().map(|e| e.message.clone())))
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build a text search request.
///
/// `sort`: -1 none, 0 relevance, 1 duration, 2 rating, 3 downloads.
/// `filter`: -1 none, 0 username, 1 tag, 2 description, 3 comment. With a
/// filter, `text` becomes the filter value.
/// Returns null on a null/invalid argument or missing credentials.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_search(
    client: *const FfiClient,
    text: *const c_char,
    sort: i32,
    filter: i32,
) -> *mut FfiHttpRequest {
    build_with(client, "fs_build_search", |client| {
        let text = required_str(text, "text")?;
        let mut search = SearchQuery::new(text);
        if let Some(sort) = sort_from_code(sort)? {
            search = search.sort(sort);
        }
        if let Some(field) = filter_from_code(filter)? {
            search = search.filter_by(field);
        }
        client.build_search(&search).map_err(FfiError::from)
    })
}

/// Build a request for one sound's full detail.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_sound_detail(client: *const FfiClient, id: u64) -> *mut FfiHttpRequest {
    build_with(client, "fs_build_sound_detail", |client| {
        client.build_sound_detail(id).map_err(FfiError::from)
    })
}

/// Build a request for a user profile. Needs no credentials.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_user(client: *const FfiClient, username: *const c_char) -> *mut FfiHttpRequest {
    build_with(client, "fs_build_user", |client| {
        client.build_user(required_str(username, "username")?).map_err(FfiError::from)
    })
}

/// Build a request for the first page of a user's sounds.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_user_sounds(
    client: *const FfiClient,
    username: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, "fs_build_user_sounds", |client| {
        client.build_user_sounds(required_str(username, "username")?).map_err(FfiError::from)
    })
}

/// Build a request following a page's `next` (or `previous`) cursor.
///
/// Returns null if `cursor` is null, not an absolute URL, or points outside
/// the client's base URL origin. Parse the response with
/// `fs_parse_cursor_page`.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_next_page(client: *const FfiClient, cursor: *const c_char) -> *mut FfiHttpRequest {
    build_with(client, "fs_build_next_page", |client| {
        client.build_page(required_str(cursor, "cursor")?).map_err(FfiError::from)
    })
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse::new(resp.status, str_arg(resp.body).unwrap_or("").to_string())
}

/// Shared null checks and conversion for every `fs_parse_*` function.
fn parse_with<F>(
    client: *const FfiClient,
    response: *const FfiHttpResponse,
    op: &'static str,
    parse: F,
) -> *mut FfiResult
where
    F: FnOnce(&FreesoundClient, &HttpResponse) -> *mut FfiResult + UnwindSafe,
{
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::failure(FfiError::null_arg("client"));
        }
        if response.is_null() {
            return FfiResult::failure(FfiError::null_arg("response"));
        }
        let client = unsafe { &*client };
        let resp = ffi_response_to_core(unsafe { &*response });
        parse(&client.inner, &resp)
    })
    .unwrap_or_else(|_| FfiResult::failure(FfiError::panic(op)))
}

/// Parse a search or user-sounds response. The page may hold at most the
/// client's configured page size.
///
/// Returns a result with `data_tag = SoundPage` on success.
#[unsafe(no_mangle)]
pub extern "C" fn fs_parse_sound_page(
    client: *const FfiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with(client, response, "fs_parse_sound_page", |client, resp| {
        match client.parse_sound_page(resp) {
            Ok(page) => FfiResult::ok_sound_page(page),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse the response to `fs_build_next_page(client, cursor)`. The page may
/// hold at most the `page_size` the cursor asked for.
///
/// Returns a result with `data_tag = SoundPage` on success.
#[unsafe(no_mangle)]
pub extern "C" fn fs_parse_cursor_page(
    client: *const FfiClient,
    cursor: *const c_char,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with(client, response, "fs_parse_cursor_page", |client, resp| {
        let cursor = match required_str(cursor, "cursor") {
            Ok(cursor) => cursor,
            Err(e) => return FfiResult::failure(e),
        };
        match client.parse_cursor_page(cursor, resp) {
            Ok(page) => FfiResult::ok_sound_page(page),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse a sound-detail response. `data_tag = SoundDetail` on success.
#[unsafe(no_mangle)]
pub extern "C" fn fs_parse_sound_detail(
    client: *const FfiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with(client, response, "fs_parse_sound_detail", |client, resp| {
        match client.parse_sound_detail(resp) {
            Ok(sound) => FfiResult::ok_sound_detail(sound),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse a user-profile response. `data_tag = User` on success.
#[unsafe(no_mangle)]
pub extern "C" fn fs_parse_user(client: *const FfiClient, response: *const FfiHttpResponse) -> *mut FfiResult {
    parse_with(client, response, "fs_parse_user", |client, resp| {
        match client.parse_user(resp) {
            Ok(user) => FfiResult::ok_user(user),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a request returned by any `fs_build_*` function. Safe with null.
#[unsafe(no_mangle)]
pub extern "C" fn fs_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| unsafe { FfiHttpRequest::free(req) });
}

/// Free a result returned by any `fs_parse_*` function. Safe with null.
/// `data_tag` decides what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn fs_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| unsafe { FfiResult::free(result) });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fs_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| unsafe { free_c_string(s) });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
