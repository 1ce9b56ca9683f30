//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

/// System bus connection and the libdbus backed transport.
///

use dbus::blocking::{ Connection, BlockingSender };
use dbus::channel::Sender;
use dbus::arg::{ IterAppend, Iter, ArgType };
use dbus::strings::{ BusName, Path, Interface, Member, Signature };

use crate::error::{ Result, BtError, ConstructionError, DecodeError };
use crate::typevalue::{ TypeValue, TypeSignature, signature_of };
use crate::msgbuild::Message;
use crate::transport::{ self, Transport, PendingCall };

///
pub struct BusConn
{
    conn        : Connection
}

fn error_text( err : &dbus::Error ) -> String
{
    match ( err.name(), err.message() )
    {
        ( _, Some( msg ) )      => String::from( msg )
    ,   ( Some( name ), None )  => String::from( name )
    ,   ( None, None )          => String::from( "unknown dbus error" )
    }
}

impl BusConn
{
    pub fn connect() -> Result< BusConn >
    {
        match Connection::new_system()
        {
            Ok( conn ) =>
            {
                log::debug!( "system bus connected." );
                Ok( BusConn{ conn } )
            }
        ,   Err( x ) =>
            {
                log::debug!( "{:?}", x );
                Err( BtError::Connection( error_text( &x ) ) )
            }
        }
    }

    pub fn disconnect( self )
    {
        log::debug!( "system bus disconnected." );
    }
}

/// Writes `value` through `ia`. The first failure is left in `err` and stops further writes.
fn encode<'a>( ia : &mut IterAppend<'a>, value : &TypeValue, err : &mut Option< BtError > )
{
    if err.is_some()
    {
        return;
    }

    match value
    {
        TypeValue::String( x )  => ia.append( x.as_str() )
    ,   TypeValue::Boolean( x ) => ia.append( *x )
    ,   TypeValue::Byte( x )    => ia.append( *x )
    ,   TypeValue::Int16( x )   => ia.append( *x )
    ,   TypeValue::UInt16( x )  => ia.append( *x )
    ,   TypeValue::Int32( x )   => ia.append( *x )
    ,   TypeValue::UInt32( x )  => ia.append( *x )
    ,   TypeValue::Int64( x )   => ia.append( *x )
    ,   TypeValue::UInt64( x )  => ia.append( *x )
    ,   TypeValue::Double( x )  => ia.append( *x )
    ,   TypeValue::ObjectPath( x ) =>
        {
            match Path::new( x.as_str() )
            {
                Ok( p ) => ia.append( p )
            ,   Err( _ ) => *err = Some( ConstructionError::InvalidObjectPath( String::from( x ) ).into() )
            }
        }
    ,   TypeValue::Array( elem, items ) =>
        {
            let e = elem.as_str();

            if e.starts_with( '{' ) && e.ends_with( '}' ) && e.len() > 3
            {
                // "{" key value "}" ; keys are basic, one character
                match ( Signature::new( &e[ 1 .. 2 ] ), Signature::new( &e[ 2 .. e.len() - 1 ] ) )
                {
                    ( Ok( ks ), Ok( vs ) ) =>
                    {
                        ia.append_dict( &ks, &vs, | s | for x in items { encode( s, x, err ) } );
                    }
                ,   _ =>
                    {
                        *err = Some( ConstructionError::InvalidSignature( String::from( e ) ).into() );
                    }
                }
            }
            else
            {
                match Signature::new( e )
                {
                    Ok( sig ) =>
                    {
                        ia.append_array( &sig, | s | for x in items { encode( s, x, err ) } );
                    }
                ,   Err( _ ) =>
                    {
                        *err = Some( ConstructionError::InvalidSignature( String::from( e ) ).into() );
                    }
                }
            }
        }
    ,   TypeValue::DictEntry( k, v ) =>
        {
            ia.append_dict_entry(
                | s |
                {
                    s.append( k.as_str() );
                    encode( s, v, err );
                }
            );
        }
    ,   TypeValue::Variant( inner ) =>
        {
            let sig =
                signature_of( inner )
                    .and_then( | x | Signature::new( x.as_str() ).map_err( | _ | ConstructionError::InvalidSignature( x.to_string() ).into() ) );

            match sig
            {
                Ok( sig ) =>
                {
                    ia.append_variant( &sig, | s | encode( s, inner, err ) );
                }
            ,   Err( x ) =>
                {
                    *err = Some( x );
                }
            }
        }
    }
}

/// Encodes a built message as a libdbus method call.
pub fn to_dbus_message( msg : &Message ) -> Result< dbus::Message >
{
    let invalid = | x : String | BtError::from( ConstructionError::InvalidHeader( x ) );

    let dest    = BusName::new( msg.destination() ).map_err( invalid )?;
    let path    = Path::new( msg.path() ).map_err( | _ | BtError::from( ConstructionError::InvalidObjectPath( String::from( msg.path() ) ) ) )?;
    let intf    = Interface::new( msg.interface() ).map_err( invalid )?;
    let member  = Member::new( msg.member() ).map_err( invalid )?;

    let mut m = dbus::Message::new_method_call( dest, path, intf, member ).map_err( invalid )?;

    let mut err = None;

    {
        let mut ia = IterAppend::new( &mut m );

        for x in msg.args()
        {
            encode( &mut ia, x, &mut err );
        }
    }

    match err
    {
        Some( x ) => Err( x )
    ,   None => Ok( m )
    }
}

fn decode( it : &mut Iter ) -> Result< TypeValue >
{
    let t = it.arg_type();

    let value =
        match t
        {
            ArgType::String     => it.get::< &str >().map( TypeValue::string )
        ,   ArgType::Boolean    => it.get::< bool >().map( TypeValue::Boolean )
        ,   ArgType::Byte       => it.get::< u8 >().map( TypeValue::Byte )
        ,   ArgType::Int16      => it.get::< i16 >().map( TypeValue::Int16 )
        ,   ArgType::UInt16     => it.get::< u16 >().map( TypeValue::UInt16 )
        ,   ArgType::Int32      => it.get::< i32 >().map( TypeValue::Int32 )
        ,   ArgType::UInt32     => it.get::< u32 >().map( TypeValue::UInt32 )
        ,   ArgType::Int64      => it.get::< i64 >().map( TypeValue::Int64 )
        ,   ArgType::UInt64     => it.get::< u64 >().map( TypeValue::UInt64 )
        ,   ArgType::Double     => it.get::< f64 >().map( TypeValue::Double )
        ,   ArgType::ObjectPath => it.get::< Path >().map( | p | TypeValue::ObjectPath( p.to_string() ) )
        ,   ArgType::Variant =>
            {
                match it.recurse( ArgType::Variant )
                {
                    Some( mut sub ) => Some( TypeValue::variant( decode( &mut sub )? ) )
                ,   None => None
                }
            }
        ,   ArgType::Array =>
            {
                let sig = it.signature();
                let elem = TypeSignature::new( &sig[ 1 .. ] );

                match it.recurse( ArgType::Array )
                {
                    Some( mut sub ) =>
                    {
                        let mut items = Vec::new();

                        while sub.arg_type() != ArgType::Invalid
                        {
                            items.push( decode( &mut sub )? );
                            sub.next();
                        }

                        Some( TypeValue::Array( elem, items ) )
                    }
                ,   None => None
                }
            }
        ,   ArgType::DictEntry =>
            {
                match it.recurse( ArgType::DictEntry )
                {
                    Some( mut sub ) =>
                    {
                        let key =
                            match decode( &mut sub )?
                            {
                                TypeValue::String( k ) => k
                            ,   x => return Err( DecodeError::UnexpectedType( String::from( x.kind_name() ) ).into() )
                            };

                        sub.next();

                        Some( TypeValue::DictEntry( key, Box::new( decode( &mut sub )? ) ) )
                    }
                ,   None => None
                }
            }
        ,   _ => None
        };

    value.ok_or( DecodeError::UnexpectedType( format!( "{:?}", t ) ).into() )
}

/// Reads all arguments of a libdbus message.
pub fn read_args( m : &dbus::Message ) -> Result< Vec< TypeValue > >
{
    let mut args = Vec::new();
    let mut it = m.iter_init();

    while it.arg_type() != ArgType::Invalid
    {
        args.push( decode( &mut it )? );
        it.next();
    }

    Ok( args )
}

/// Outgoing queue of a connection.
trait Outbox
{
    fn enqueue( &self, m : dbus::Message ) -> std::result::Result< u32, () >;
    fn flush( &self );
}

impl Outbox for Connection
{
    fn enqueue( &self, m : dbus::Message ) -> std::result::Result< u32, () >
    {
        self.send( m )
    }

    fn flush( &self )
    {
        self.channel().flush();
    }
}

/// Queues `m` and writes it out before returning; nothing waits for a reply.
fn post< O : Outbox >( out : &O, m : dbus::Message ) -> Result< PendingCall >
{
    match out.enqueue( m )
    {
        Ok( serial ) =>
        {
            out.flush();
            Ok( PendingCall{ serial } )
        }
    ,   Err( _ ) =>
        {
            Err( BtError::Transport( String::from( "Out Of Memory!" ) ) )
        }
    }
}

///
pub struct DbusTransport;

impl Transport for DbusTransport
{
    type Conn = BusConn;

    fn send_one_way( &self, conn : &BusConn, msg : Message ) -> Result< () >
    {
        self.send_with_reply( conn, msg ).map( | _ | () )
    }

    fn send_with_reply( &self, conn : &BusConn, msg : Message ) -> Result< PendingCall >
    {
        let m = to_dbus_message( &msg )?;

        let pending = post( &conn.conn, m )?;

        log::debug!( "sent {}.{} serial {}", msg.interface(), msg.member(), pending.serial );

        Ok( pending )
    }

    fn send_and_wait( &self, conn : &BusConn, msg : Message, timeout_ms : i32 ) -> Result< Message >
    {
        let m = to_dbus_message( &msg )?;

        match conn.conn.send_with_reply_and_block( m, transport::resolve_timeout( timeout_ms ) )
        {
            Ok( reply ) =>
            {
                let args = read_args( &reply )?;

                log::debug!( "reply {}.{} args {}", msg.interface(), msg.member(), args.len() );

                Ok( Message::method_return( args ) )
            }
        ,   Err( x ) =>
            {
                log::debug!( "{:?}", x );
                Err( BtError::Transport( error_text( &x ) ) )
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use crate::msgbuild::MessageBuilder;

    #[derive(Default)]
    struct RecordingOutbox
    {
        full    : bool
    ,   log     : RefCell< Vec< &'static str > >
    }

    impl Outbox for RecordingOutbox
    {
        fn enqueue( &self, _m : dbus::Message ) -> std::result::Result< u32, () >
        {
            self.log.borrow_mut().push( "enqueue" );

            if self.full { Err( () ) } else { Ok( 7 ) }
        }

        fn flush( &self )
        {
            self.log.borrow_mut().push( "flush" );
        }
    }

    fn start_discovery() -> dbus::Message
    {
        to_dbus_message(
            &MessageBuilder::new_call( "org.bluez", "/org/bluez/hci0", "org.bluez.Adapter1", "StartDiscovery" ).build().unwrap()
        ).unwrap()
    }

    fn advertisement() -> Message
    {
        MessageBuilder::new_call( "org.bluez", "/org/bluez/hci0", "org.bluez.LEAdvertisingManager1", "RegisterAdvertisement" )
            .append( TypeValue::object_path( "/com/example/Advertisement1" ) )
            .append_dict(
                vec![
                    ( String::from( "Type" ), TypeValue::string( "peripheral" ) )
                ,   ( String::from( "ServiceUUIDs" ), TypeValue::string_array( &[ "0000180d-0000-1000-8000-00805f9b34fb" ] ) )
                ]
            )
            .build()
            .unwrap()
    }

    #[test]
    fn advertisement_wire_signature()
    {
        let m = to_dbus_message( &advertisement() ).unwrap();

        let mut it = m.iter_init();

        assert_eq!( &*it.signature(), "o" );
        assert!( it.next() );
        assert_eq!( &*it.signature(), "a{sv}" );
        assert!( !it.next() );
    }

    #[test]
    fn encoded_arguments_read_back()
    {
        let msg = advertisement();
        let m = to_dbus_message( &msg ).unwrap();

        assert_eq!( read_args( &m ).unwrap(), msg.args() );
    }

    #[test]
    fn reply_message_has_no_header()
    {
        let reply = Message::method_return( vec![ TypeValue::variant( TypeValue::string( "AA:BB:CC:DD:EE:FF" ) ) ] );

        assert!( matches!( to_dbus_message( &reply ), Err( BtError::MessageConstruction( _ ) ) ) );
    }

    #[test]
    fn post_flushes_after_enqueue()
    {
        let out = RecordingOutbox::default();

        assert_eq!( post( &out, start_discovery() ), Ok( PendingCall{ serial : 7 } ) );
        assert_eq!( *out.log.borrow(), vec![ "enqueue", "flush" ] );
    }

    #[test]
    fn failed_enqueue_is_not_flushed()
    {
        let out = RecordingOutbox{ full : true, ..Default::default() };

        assert_eq!( post( &out, start_discovery() ), Err( BtError::Transport( String::from( "Out Of Memory!" ) ) ) );
        assert_eq!( *out.log.borrow(), vec![ "enqueue" ] );
    }

    #[test]
    fn dict_keys_must_be_text()
    {
        let mut props = HashMap::new();
        props.insert( Path::new( "/org/bluez/hci0" ).unwrap(), dbus::arg::Variant( true ) );

        let m = start_discovery().append1( props );

        assert_eq!(
            read_args( &m )
        ,   Err( BtError::Decode( DecodeError::UnexpectedType( String::from( "object_path" ) ) ) )
        );
    }
}
