#![no_main]

use libfuzzer_sys::fuzz_target;
use ssh_agent_x509::{
    frame::{read_frame, MAX_FRAME_LEN},
    transport::Transport,
};

fuzz_target!(|data: &[u8]| {
    let mut transport = Transport::new(std::io::Cursor::new(data.to_vec()));
    if let Ok(frame) = read_frame(&mut transport, MAX_FRAME_LEN) {
        let _ = frame.to_response();
    }
});
