//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

/// https://git.kernel.org/pub/scm/bluetooth/bluez.git/tree/doc/adapter-api.txt
/// https://git.kernel.org/pub/scm/bluetooth/bluez.git/tree/doc/advertising-api.txt
///
/// Every operation borrows the connection for the duration of the call.
/// Nothing is retried and nothing is rolled back.

use crate::error::Result;
use crate::typevalue::TypeValue;
use crate::msgbuild::MessageBuilder;
use crate::transport::Transport;
use crate::reply;

pub static BLUEZ_SERVICE_NAME           : &'static str = "org.bluez";
pub static BLUEZ_ADAPTER_PATH           : &'static str = "/org/bluez/hci0";

pub static PROPERTIES_INTERFACE         : &'static str = "org.freedesktop.DBus.Properties";
pub static BLUEZ_ADAPTER_INTERFACE      : &'static str = "org.bluez.Adapter1";
pub static BLUEZ_ADVERTISING_MANAGER_INTERFACE : &'static str = "org.bluez.LEAdvertisingManager1";

///
pub struct AdapterClient< T : Transport >
{
    transport   : T
,   service     : String
,   path        : String
}

impl< T : Transport > AdapterClient< T >
{
    pub fn new( transport : T ) -> AdapterClient< T >
    {
        Self::with_path( transport, BLUEZ_ADAPTER_PATH )
    }

    pub fn with_path( transport : T, path : &str ) -> AdapterClient< T >
    {
        AdapterClient
        {
            transport
        ,   service : String::from( BLUEZ_SERVICE_NAME )
        ,   path    : String::from( path )
        }
    }

    pub fn get_id( &self ) -> &str
    {
        &self.path
    }

    pub fn transport( &self ) -> &T
    {
        &self.transport
    }

    fn call( &self, interface : &str, member : &str ) -> MessageBuilder
    {
        MessageBuilder::new_call( &self.service, &self.path, interface, member )
    }

    fn call_void_func( &self, conn : &T::Conn, interface : &str, func_name : &str ) -> Result< () >
    {
        let msg = self.call( interface, func_name ).build()?;

        self.transport.send_one_way( conn, msg )
    }

    pub fn start_discovery( &self, conn : &T::Conn ) -> Result< () >
    {
        self.call_void_func( conn, BLUEZ_ADAPTER_INTERFACE, "StartDiscovery" )?;

        log::info!( "Bluetooth scan started. [{}]", &self.path );

        Ok( () )
    }

    pub fn stop_discovery( &self, conn : &T::Conn ) -> Result< () >
    {
        self.call_void_func( conn, BLUEZ_ADAPTER_INTERFACE, "StopDiscovery" )?;

        log::info!( "Bluetooth scan stopped. [{}]", &self.path );

        Ok( () )
    }

    /// Blocks for up to `timeout_ms`; -1 selects the transport default.
    pub fn get_property( &self, conn : &T::Conn, interface : &str, property : &str, timeout_ms : i32 ) -> Result< String >
    {
        let msg =
            self.call( PROPERTIES_INTERFACE, "Get" )
                .append( TypeValue::string( interface ) )
                .append( TypeValue::string( property ) )
                .build()?;

        let reply = self.transport.send_and_wait( conn, msg, timeout_ms )?;

        let value = reply::decode_single_variant_string( &reply )?;

        log::debug!( "get {} {}.{} -> {:?}", &self.path, interface, property, &value );

        Ok( value )
    }

    /// Fire and forget. Whether the peer applied the value is not observable here.
    pub fn set_property( &self, conn : &T::Conn, interface : &str, property : &str, value : TypeValue ) -> Result< () >
    {
        log::debug!( "set {} {}.{} <- {:?}", &self.path, interface, property, &value );

        let msg =
            self.call( PROPERTIES_INTERFACE, "Set" )
                .append( TypeValue::string( interface ) )
                .append( TypeValue::string( property ) )
                .append_variant( value )
                .build()?;

        self.transport.send_one_way( conn, msg )
    }

    pub fn set_powered( &self, conn : &T::Conn, enable : bool ) -> Result< () >
    {
        self.set_property( conn, BLUEZ_ADAPTER_INTERFACE, "Powered", TypeValue::Boolean( enable ) )
    }

    /// The reply is left pending and never inspected.
    pub fn register_advertisement( &self, conn : &T::Conn, object_path : &str, properties : Vec< ( String, TypeValue ) > ) -> Result< () >
    {
        let msg =
            self.call( BLUEZ_ADVERTISING_MANAGER_INTERFACE, "RegisterAdvertisement" )
                .append( TypeValue::object_path( object_path ) )
                .append_dict( properties )
                .build()?;

        let pending = self.transport.send_with_reply( conn, msg )?;

        log::info!( "advertisement registering. [{}] serial {}", object_path, pending.serial );

        Ok( () )
    }

    pub fn unregister_advertisement( &self, conn : &T::Conn, object_path : &str ) -> Result< () >
    {
        let msg =
            self.call( BLUEZ_ADVERTISING_MANAGER_INTERFACE, "UnregisterAdvertisement" )
                .append( TypeValue::object_path( object_path ) )
                .build()?;

        self.transport.send_one_way( conn, msg )
    }
}
