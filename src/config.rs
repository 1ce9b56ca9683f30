//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

///
///

use std::io;
use std::fs;

use serde::{ Deserialize };

use crate::typevalue::{ self, TypeValue };
use crate::btctrl;
use crate::transport;

///
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config
{
    pub log_level           : String
,   pub adapter_path        : String
,   pub call_timeout_ms     : i32
,   pub le_mode             : bool
,   pub advertise           : bool
,   pub advertisement_path  : String
,   pub advertisement_type  : String
,   pub service_uuids       : Vec< String >
}

impl Default for Config
{
    fn default() -> Config
    {
        Config
        {
            log_level           : String::new()
        ,   adapter_path        : String::from( btctrl::BLUEZ_ADAPTER_PATH )
        ,   call_timeout_ms     : transport::USE_DEFAULT_TIMEOUT
        ,   le_mode             : false
        ,   advertise           : false
        ,   advertisement_path  : String::from( "/org/bluez/hci0/advertisement0" )
        ,   advertisement_type  : String::from( "peripheral" )
        ,   service_uuids       : vec![ String::from( "0000180d-0000-1000-8000-00805f9b34fb" ) ]
        }
    }
}

impl Config
{
    /// `a{sv}` payload of RegisterAdvertisement.
    pub fn advertisement_properties( &self ) -> Vec< ( String, TypeValue ) >
    {
        vec![
            ( String::from( "Type" ),           TypeValue::string( &self.advertisement_type ) )
        ,   ( String::from( "ServiceUUIDs" ),   TypeValue::string_array( &self.service_uuids[ .. ] ) )
        ]
    }
}

///
pub fn parse_config( conts : &str ) -> Option< Config >
{
    let err_prefix = "config load error ";

    match toml::de::from_str::<Config>( conts )
    {
        Ok( x ) =>
        {
            if !typevalue::is_object_path( &x.adapter_path )
            {
                log::error!( "invalid value `adapter_path`" );
            }
            else if !typevalue::is_object_path( &x.advertisement_path )
            {
                log::error!( "invalid value `advertisement_path`" );
            }
            else
            {
                return Some( x );
            }
        }
    ,   Err( x ) => { log::error!( "{} [{:?}]", err_prefix, &x ); }
    }

    None
}

/// Candidate files, first hit wins.
fn config_targets( arg : Option< String > ) -> Vec< String >
{
    arg.into_iter()
        .chain( [ "btbus.conf", "/etc/btbus.conf" ].iter().map( | x | String::from( *x ) ) )
        .collect()
}

fn read_config_file( target : &str ) -> Option< String >
{
    log::debug!( "config try loading [{:?}]", target );

    match fs::read_to_string( target )
    {
        Ok( x ) =>
        {
            log::info!( "config loading [{}]", target );
            Some( x )
        }
    ,   Err( x ) if x.kind() == io::ErrorKind::NotFound =>
        {
            log::debug!( "config load error [{:?}]", &x );
            None
        }
    ,   Err( x ) =>
        {
            log::error!( "config load error [{}] [{:?}]", target, &x );
            None
        }
    }
}

/// Missing files fall back to defaults; a file that fails to parse does not.
pub fn get_config() -> Option< Config >
{
    let targets = config_targets( std::env::args().nth( 1 ) );

    match targets.iter().find_map( | t | read_config_file( t ) )
    {
        Some( conts ) => parse_config( &conts )
    ,   None =>
        {
            log::info!( "config not found. use defaults." );
            Some( Config::default() )
        }
    }
}
