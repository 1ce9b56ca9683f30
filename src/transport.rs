//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

///
///

use std::time::Duration;

use crate::error::Result;
use crate::msgbuild::Message;

/// libdbus uses 25 seconds when a caller passes -1.
pub const DEFAULT_TIMEOUT   : Duration = Duration::from_secs( 25 );

/// Use the transport's default timeout.
pub const USE_DEFAULT_TIMEOUT : i32 = -1;

/// A sent request whose reply nobody waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCall
{
    pub serial : u32
}

/// Sends built messages over a borrowed connection.
///
/// Errors are returned as `BtError::Transport` and are never retried here.
pub trait Transport
{
    type Conn;

    /// Queues `msg` and returns without waiting for any reply.
    fn send_one_way( &self, conn : &Self::Conn, msg : Message ) -> Result< () >;

    /// Queues `msg` expecting a reply, but does not wait for it.
    fn send_with_reply( &self, conn : &Self::Conn, msg : Message ) -> Result< PendingCall >;

    /// Blocks until the reply arrives or `timeout_ms` elapses. Negative means the default timeout.
    fn send_and_wait( &self, conn : &Self::Conn, msg : Message, timeout_ms : i32 ) -> Result< Message >;
}

///
pub fn resolve_timeout( timeout_ms : i32 ) -> Duration
{
    if timeout_ms < 0
    {
        DEFAULT_TIMEOUT
    }
    else
    {
        Duration::from_millis( timeout_ms as u64 )
    }
}
