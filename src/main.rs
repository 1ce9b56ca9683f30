//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

///
///

extern crate pretty_env_logger;

use btbus::config::{ self, Config };
use btbus::bt::{ BusConn, DbusTransport };
use btbus::btctrl::{ AdapterClient, BLUEZ_ADAPTER_INTERFACE };

///
const PKG_NAME :    &'static str = env!( "CARGO_PKG_NAME" );
///
const PKG_VERSION : &'static str = env!( "CARGO_PKG_VERSION") ;

fn sequence( client : &AdapterClient< DbusTransport >, conn : &BusConn, config : &Config ) -> btbus::Result< () >
{
    client.start_discovery( conn )?;

    let address = client.get_property( conn, BLUEZ_ADAPTER_INTERFACE, "Address", config.call_timeout_ms )?;

    println!( "Bluetooth MAC Address: {}", address );

    if config.le_mode
    {
        client.set_powered( conn, true )?;
        log::info!( "adapter powered. [{}]", client.get_id() );
    }

    if config.advertise
    {
        client.register_advertisement( conn, &config.advertisement_path, config.advertisement_properties() )?;
    }

    Ok( () )
}

fn run( config : &Config ) -> btbus::Result< () >
{
    let conn = BusConn::connect()?;

    let client = AdapterClient::with_path( DbusTransport, &config.adapter_path );

    let ret = sequence( &client, &conn, config );

    conn.disconnect();

    ret
}

///
fn main()
{
    if let None = std::env::var_os( "RUST_LOG" )
    {
        std::env::set_var(
            "RUST_LOG"
        ,   if cfg!(debug_assertions)
            {
                "debug"
            }
            else
            {
                "info"
            }
        );
    }

    pretty_env_logger::init();

    log::debug!( "{} {}", PKG_NAME, PKG_VERSION );

    let config =
        match config::get_config()
        {
            Some( x ) => x
        ,   None =>
            {
                eprintln!( "Error: config load error" );
                std::process::exit( 1 );
            }
        };

    if config.log_level != ""
    {
        match config.log_level.parse::< log::LevelFilter >()
        {
            Ok( x ) => log::set_max_level( x )
        ,   Err( _ ) => log::warn!( "invalid value `log_level` [{}]", &config.log_level )
        }
    }

    if let Err( x ) = run( &config )
    {
        log::error!( "{:?}", x );
        eprintln!( "Error: {}", x );
        std::process::exit( 1 );
    }
}
