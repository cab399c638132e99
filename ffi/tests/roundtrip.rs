//! Drives the C ABI the way a host would: build through `fs_build_*`,
//! execute over real HTTP, hand the response to `fs_parse_*`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use freesound_ffi::types::{
    FfiClient, FfiDataTag, FfiErrorCode, FfiHttpRequest, FfiHttpResponse, FfiResult, FfiSoundDetail,
    FfiSoundPage, FfiUser,
};
use freesound_ffi::*;

fn start_mock_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn c_str<'a>(ptr: *const c_char) -> &'a str {
    assert!(!ptr.is_null());
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
}

/// Execute `req` with ureq and free it, returning status and body.
fn execute(req: *mut FfiHttpRequest) -> (u16, CString) {
    assert!(!req.is_null());
    let r = unsafe { &*req };
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let mut request = agent.get(c_str(r.url));
    if !r.headers.is_null() {
        for h in unsafe { std::slice::from_raw_parts(r.headers, r.headers_len as usize) } {
            request = request.header(c_str(h.key), c_str(h.value));
        }
    }
    let mut response = request.call().expect("HTTP transport error");
    let status = response.status().as_u16();
    let body = CString::new(response.body_mut().read_to_string().unwrap_or_default()).unwrap();
    fs_free_request(req);
    (status, body)
}

/// Execute `req`, then parse with `parse`.
fn roundtrip(
    client: *const FfiClient,
    req: *mut FfiHttpRequest,
    parse: extern "C" fn(*const FfiClient, *const FfiHttpResponse) -> *mut FfiResult,
) -> *mut FfiResult {
    let (status, body) = execute(req);
    parse(
        client,
        &FfiHttpResponse {
            status,
            body: body.as_ptr(),
        },
    )
}

fn page<'a>(result: *mut FfiResult) -> &'a FfiSoundPage {
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::Ok);
    assert_eq!(r.data_tag, FfiDataTag::SoundPage);
    unsafe { &*(r.data as *const FfiSoundPage) }
}

fn names(page: &FfiSoundPage) -> Vec<String> {
    if page.items.is_null() {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(page.items, page.len as usize) }
        .iter()
        .map(|s| c_str(s.name).to_string())
        .collect()
}

#[test]
fn browse_through_the_c_abi() {
    let addr = start_mock_server();
    let url = CString::new(format!("http://{addr}")).unwrap();
    let id = CString::new("client").unwrap();
    let secret = CString::new("secret").unwrap();
    let client = fs_client_new(url.as_ptr(), id.as_ptr(), secret.as_ptr(), 3);
    assert!(!client.is_null());

    // Relevance search for "piano".
    let text = CString::new("piano").unwrap();
    let result = roundtrip(client, fs_build_search(client, text.as_ptr(), 0, -1), fs_parse_sound_page);
    let first = page(result);
    assert_eq!(first.count, 2);
    assert!(first.next.is_null());
    assert_eq!(names(first), ["Piano C4", "Piano loop"]);
    fs_free_result(result);

    // Walk every page of an unrestricted search via cursors.
    let empty = CString::new("").unwrap();
    let mut result = roundtrip(client, fs_build_search(client, empty.as_ptr(), -1, -1), fs_parse_sound_page);
    let mut all = Vec::new();
    loop {
        let current = page(result);
        all.extend(names(current));
        if current.next.is_null() {
            break;
        }
        let (status, body) = execute(fs_build_next_page(client, current.next));
        let following = fs_parse_cursor_page(
            client,
            current.next,
            &FfiHttpResponse {
                status,
                body: body.as_ptr(),
            },
        );
        fs_free_result(result);
        result = following;
    }
    fs_free_result(result);
    assert_eq!(all.len(), 7);

    // Tag filter with a space in the value.
    let tag = CString::new("field recording").unwrap();
    let result = roundtrip(client, fs_build_search(client, tag.as_ptr(), -1, 1), fs_parse_sound_page);
    assert_eq!(names(page(result)), ["Birdsong at dawn"]);
    fs_free_result(result);

    // Sound detail with previews.
    let result = roundtrip(client, fs_build_sound_detail(client, 1003), fs_parse_sound_detail);
    let r = unsafe { &*result };
    assert_eq!(r.data_tag, FfiDataTag::SoundDetail);
    let detail = unsafe { &*(r.data as *const FfiSoundDetail) };
    assert_eq!(c_str(detail.name), "Rain on window");
    assert!(c_str(detail.preview_hq_mp3).ends_with("/previews/1003-hq.mp3"));
    fs_free_result(result);

    // Missing sound surfaces the status.
    let result = roundtrip(client, fs_build_sound_detail(client, 999), fs_parse_sound_detail);
    let r = unsafe { &*result };
    assert_eq!(r.error_code, FfiErrorCode::ServerStatus);
    assert_eq!(r.http_status, 404);
    fs_free_result(result);

    // User profile and that user's sounds.
    let name = CString::new("jo smith").unwrap();
    let result = roundtrip(client, fs_build_user(client, name.as_ptr()), fs_parse_user);
    let r = unsafe { &*result };
    let user = unsafe { &*(r.data as *const FfiUser) };
    assert_eq!(c_str(user.username), "jo smith");
    assert_eq!(user.num_sounds, 0);
    fs_free_result(result);

    let name = CString::new("alice").unwrap();
    let result = roundtrip(client, fs_build_user_sounds(client, name.as_ptr()), fs_parse_sound_page);
    assert_eq!(names(page(result)), ["Piano C4", "Birdsong at dawn"]);
    fs_free_result(result);

    fs_client_free(client);
}
