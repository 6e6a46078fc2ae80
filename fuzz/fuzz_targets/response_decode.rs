#![no_main]

use libfuzzer_sys::fuzz_target;
use ssh_agent_x509::proto::{extension::QueryResponse, Response};
use ssh_encoding::Decode;

fuzz_target!(|data: &[u8]| {
    let _ = Response::decode(&mut &data[..]);
    let _ = QueryResponse::decode(&mut &data[..]);
});
