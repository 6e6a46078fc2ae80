//! Agent protocol message structures.

mod extension;
mod failure;
mod identity;
mod request;
mod response;
mod sign;
mod unparsed;

pub use self::{
    extension::*, failure::*, identity::*, request::*, response::*, sign::*, unparsed::*,
};
