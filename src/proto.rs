//! SSH agent protocol structures

mod code;
pub mod error;
pub mod extension;
pub mod message;

pub use self::code::*;
pub use self::error::{ProtoError as Error, ProtoResult as Result, *};
pub use self::extension::{
    AdvertisedExtension, ExtensionCall, ExtensionDescriptor, ExtensionRegistry, MessageExtension,
    PayloadShape,
};
pub use self::message::*;
