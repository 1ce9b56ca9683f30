//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

/// Bluetooth adapter control over the dbus system bus.
///

#[macro_use]
extern crate lazy_static;

pub mod error;
pub mod typevalue;
pub mod msgbuild;
pub mod transport;
pub mod reply;
pub mod bt;
pub mod btctrl;
pub mod config;

pub use crate::error::{ Result, BtError, ConstructionError, DecodeError };
pub use crate::typevalue::{ TypeValue, TypeSignature, signature_of };
pub use crate::msgbuild::{ Message, MessageBuilder, ContainerKind, TraceStep };
pub use crate::transport::{ Transport, PendingCall };
pub use crate::btctrl::AdapterClient;
