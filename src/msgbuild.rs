//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

/// Method call construction with an explicit container stack.
///
/// Every open pushes a marker, every close pops it and places the finished
/// container into its parent. A write that does not fit the innermost open
/// container poisons the builder; `build` reports the first such error.

use dbus::strings::{ BusName, Path, Interface, Member };

use crate::error::{ Result, BtError, ConstructionError };
use crate::typevalue::{ TypeValue, TypeSignature, signature_of, check_element_signature, check_single_signature };

///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind
{
    Array
,   DictEntry
,   Variant
}

/// One open, close or basic write, in the order the encoder performs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStep
{
    Open( ContainerKind, TypeSignature )
,   Close( ContainerKind, TypeSignature )
,   Basic( TypeSignature )
}

///
#[derive(Debug, Clone, PartialEq)]
pub struct Message
{
    destination : String
,   path        : String
,   interface   : String
,   member      : String
,   args        : Vec< TypeValue >
,   trace       : Vec< TraceStep >
}

impl Message
{
    /// A method return carrying `args`. Header fields stay empty.
    pub fn method_return( args : Vec< TypeValue > ) -> Message
    {
        Message
        {
            destination : String::new()
        ,   path        : String::new()
        ,   interface   : String::new()
        ,   member      : String::new()
        ,   args
        ,   trace       : Vec::new()
        }
    }

    pub fn destination( &self ) -> &str
    {
        &self.destination
    }

    pub fn path( &self ) -> &str
    {
        &self.path
    }

    pub fn interface( &self ) -> &str
    {
        &self.interface
    }

    pub fn member( &self ) -> &str
    {
        &self.member
    }

    pub fn args( &self ) -> &[ TypeValue ]
    {
        &self.args
    }

    pub fn trace( &self ) -> &[ TraceStep ]
    {
        &self.trace
    }

    /// Concatenated signature of all top-level arguments.
    pub fn signature( &self ) -> Result< String >
    {
        let mut sink = String::new();

        for x in self.args.iter()
        {
            sink += signature_of( x )?.as_str();
        }

        Ok( sink )
    }
}

#[derive(Debug)]
struct OpenContainer
{
    kind    : ContainerKind
,   sig     : TypeSignature
,   items   : Vec< TypeValue >
}

///
#[derive(Debug)]
pub struct MessageBuilder
{
    destination : String
,   path        : String
,   interface   : String
,   member      : String
,   args        : Vec< TypeValue >
,   stack       : Vec< OpenContainer >
,   trace       : Vec< TraceStep >
,   err         : Option< BtError >
}

fn misplaced( msg : String ) -> BtError
{
    ConstructionError::MisplacedValue( msg ).into()
}

fn check_header( destination : &str, path : &str, interface : &str, member : &str ) -> Result< () >
{
    let invalid = | x : String | BtError::from( ConstructionError::InvalidHeader( x ) );

    BusName::new( destination ).map_err( invalid )?;
    Interface::new( interface ).map_err( invalid )?;
    Member::new( member ).map_err( invalid )?;
    Path::new( path ).map_err( | _ | BtError::from( ConstructionError::InvalidObjectPath( String::from( path ) ) ) )?;

    Ok( () )
}

/// Records the steps an encoder takes to write `value`.
fn trace_value( value : &TypeValue, trace : &mut Vec< TraceStep > ) -> Result< () >
{
    match value
    {
        TypeValue::Array( elem, items ) =>
        {
            trace.push( TraceStep::Open( ContainerKind::Array, elem.clone() ) );

            for x in items
            {
                trace_value( x, trace )?;
            }

            trace.push( TraceStep::Close( ContainerKind::Array, elem.clone() ) );
        }
    ,   TypeValue::DictEntry( k, v ) =>
        {
            let sig = signature_of( value )?;

            trace.push( TraceStep::Open( ContainerKind::DictEntry, sig.clone() ) );
            trace_value( &TypeValue::string( k ), trace )?;
            trace_value( v, trace )?;
            trace.push( TraceStep::Close( ContainerKind::DictEntry, sig ) );
        }
    ,   TypeValue::Variant( inner ) =>
        {
            let sig = signature_of( inner )?;

            trace.push( TraceStep::Open( ContainerKind::Variant, sig.clone() ) );
            trace_value( inner, trace )?;
            trace.push( TraceStep::Close( ContainerKind::Variant, sig ) );
        }
    ,   x =>
        {
            trace.push( TraceStep::Basic( signature_of( x )? ) );
        }
    }

    Ok( () )
}

impl MessageBuilder
{
    pub fn new_call( destination : &str, path : &str, interface : &str, member : &str ) -> MessageBuilder
    {
        let err = check_header( destination, path, interface, member ).err();

        MessageBuilder
        {
            destination : String::from( destination )
        ,   path        : String::from( path )
        ,   interface   : String::from( interface )
        ,   member      : String::from( member )
        ,   args        : Vec::new()
        ,   stack       : Vec::new()
        ,   trace       : Vec::new()
        ,   err
        }
    }

    fn step< F >( mut self, f : F ) -> MessageBuilder
        where F : FnOnce( &mut MessageBuilder ) -> Result< () >
    {
        if self.err.is_none()
        {
            if let Err( x ) = f( &mut self )
            {
                log::debug!( "{}.{} construction error. [{}]", &self.interface, &self.member, &x );
                self.err = Some( x );
            }
        }

        self
    }

    /// Places a finished value into the innermost open container or the argument list.
    fn place( &mut self, value : TypeValue, sig : TypeSignature ) -> Result< () >
    {
        match self.stack.last_mut()
        {
            None =>
            {
                if let TypeValue::DictEntry( _, _ ) = value
                {
                    return Err( misplaced( String::from( "dict entry outside array" ) ) );
                }

                self.args.push( value );
            }
        ,   Some( top ) =>
            {
                match top.kind
                {
                    ContainerKind::Array =>
                    {
                        if sig != top.sig
                        {
                            return Err(
                                ConstructionError::HeterogeneousArray
                                {
                                    expected    : top.sig.to_string()
                                ,   found       : sig.to_string()
                                }.into()
                            );
                        }
                    }
                ,   ContainerKind::Variant =>
                    {
                        if !top.items.is_empty()
                        {
                            return Err( misplaced( String::from( "variant already holds a value" ) ) );
                        }

                        if sig != top.sig
                        {
                            return Err( misplaced( format!( "variant of `{}` can not hold `{}`", &top.sig, &sig ) ) );
                        }
                    }
                ,   ContainerKind::DictEntry =>
                    {
                        match top.items.len()
                        {
                            0 =>
                            {
                                if let TypeValue::String( _ ) = value {}
                                else
                                {
                                    return Err( misplaced( format!( "dict entry key must be a string, not `{}`", &sig ) ) );
                                }
                            }
                        ,   1 =>
                            {
                                // "{s" + value + "}"
                                let entry = top.sig.as_str();
                                let expected = &entry[ 2 .. entry.len() - 1 ];

                                if sig.as_str() != expected
                                {
                                    return Err( misplaced( format!( "dict entry of `{}` can not hold `{}`", entry, &sig ) ) );
                                }
                            }
                        ,   _ =>
                            {
                                return Err( misplaced( String::from( "dict entry already holds key and value" ) ) );
                            }
                        }
                    }
                }

                top.items.push( value );
            }
        }

        Ok( () )
    }

    fn write( &mut self, value : TypeValue ) -> Result< () >
    {
        let sig = signature_of( &value )?;

        let mut steps = Vec::new();
        trace_value( &value, &mut steps )?;

        self.place( value, sig )?;
        self.trace.extend( steps );

        Ok( () )
    }

    fn open_container( &mut self, kind : ContainerKind, sig : TypeSignature ) -> Result< () >
    {
        match kind
        {
            ContainerKind::Array        => check_element_signature( sig.as_str() )?
        ,   ContainerKind::Variant      => check_single_signature( sig.as_str() )?
        ,   ContainerKind::DictEntry    => check_element_signature( sig.as_str() )?
        }

        self.trace.push( TraceStep::Open( kind, sig.clone() ) );
        self.stack.push( OpenContainer{ kind, sig, items : Vec::new() } );

        Ok( () )
    }

    fn close_container( &mut self ) -> Result< () >
    {
        let top = self.stack.pop().ok_or( BtError::from( ConstructionError::UnbalancedClose ) )?;

        let OpenContainer{ kind, sig, mut items } = top;

        let value =
            match kind
            {
                ContainerKind::Array =>
                {
                    TypeValue::Array( sig.clone(), items )
                }
            ,   ContainerKind::Variant =>
                {
                    match items.pop()
                    {
                        Some( inner ) => TypeValue::Variant( Box::new( inner ) )
                    ,   None => return Err( misplaced( String::from( "variant closed without a value" ) ) )
                    }
                }
            ,   ContainerKind::DictEntry =>
                {
                    if items.len() != 2
                    {
                        return Err( misplaced( String::from( "dict entry closed without key and value" ) ) );
                    }

                    let v = items.pop();
                    let k = items.pop();

                    match ( k, v )
                    {
                        ( Some( TypeValue::String( k ) ), Some( v ) ) => TypeValue::DictEntry( k, Box::new( v ) )
                    ,   _ => return Err( misplaced( String::from( "dict entry closed without key and value" ) ) )
                    }
                }
            };

        self.trace.push( TraceStep::Close( kind, sig ) );

        let placed = signature_of( &value )?;
        self.place( value, placed )
    }

    /// Appends a positional argument, or an item of the innermost open container.
    pub fn append( self, value : TypeValue ) -> MessageBuilder
    {
        self.step( | b | b.write( value ) )
    }

    /// Wraps `value` in a variant tagged with its own signature.
    pub fn append_variant( self, value : TypeValue ) -> MessageBuilder
    {
        self.step(
            | b |
            {
                let sig = signature_of( &value )?;

                b.open_container( ContainerKind::Variant, sig )?;
                b.write( value )?;
                b.close_container()
            }
        )
    }

    /// Writes an `a{sv}` dictionary, each value wrapped in a variant.
    pub fn append_dict( self, entries : Vec< ( String, TypeValue ) > ) -> MessageBuilder
    {
        self.step(
            | b |
            {
                b.open_container( ContainerKind::Array, TypeSignature::from( "{sv}" ) )?;

                for ( k, v ) in entries
                {
                    let sig = signature_of( &v )?;

                    b.open_container( ContainerKind::DictEntry, TypeSignature::from( "{sv}" ) )?;
                    b.write( TypeValue::String( k ) )?;
                    b.open_container( ContainerKind::Variant, sig )?;
                    b.write( v )?;
                    b.close_container()?;
                    b.close_container()?;
                }

                b.close_container()
            }
        )
    }

    /// Opens an array of `elem`. Items follow through `append` or nested opens.
    pub fn open_array( self, elem : &str ) -> MessageBuilder
    {
        self.step( | b | b.open_container( ContainerKind::Array, TypeSignature::from( elem ) ) )
    }

    pub fn open_variant( self, sig : &str ) -> MessageBuilder
    {
        self.step( | b | b.open_container( ContainerKind::Variant, TypeSignature::from( sig ) ) )
    }

    /// Only valid directly inside an array of dict entries; takes the array's element signature.
    pub fn open_dict_entry( self ) -> MessageBuilder
    {
        self.step(
            | b |
            {
                let sig =
                    match b.stack.last()
                    {
                        Some( top ) if top.kind == ContainerKind::Array && top.sig.as_str().starts_with( '{' ) =>
                        {
                            top.sig.clone()
                        }
                    ,   _ =>
                        {
                            return Err( misplaced( String::from( "dict entry outside array" ) ) );
                        }
                    };

                b.open_container( ContainerKind::DictEntry, sig )
            }
        )
    }

    pub fn close( self ) -> MessageBuilder
    {
        self.step( | b | b.close_container() )
    }

    pub fn build( self ) -> Result< Message >
    {
        if let Some( x ) = self.err
        {
            return Err( x );
        }

        if let Some( top ) = self.stack.last()
        {
            return Err(
                ConstructionError::IncompleteContainer
                {
                    depth       : self.stack.len()
                ,   innermost   : format!( "{:?}({})", top.kind, &top.sig )
                }.into()
            );
        }

        log::debug!( "{} {} {}.{} args {}", &self.destination, &self.path, &self.interface, &self.member, self.args.len() );

        Ok(
            Message
            {
                destination : self.destination
            ,   path        : self.path
            ,   interface   : self.interface
            ,   member      : self.member
            ,   args        : self.args
            ,   trace       : self.trace
            }
        )
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn call() -> MessageBuilder
    {
        MessageBuilder::new_call( "org.bluez", "/org/bluez/hci0", "org.freedesktop.DBus.Properties", "Set" )
    }

    fn is_balanced( trace : &[ TraceStep ] ) -> bool
    {
        let mut stack = Vec::new();

        for x in trace
        {
            match x
            {
                TraceStep::Open( k, s ) => stack.push( ( *k, s.clone() ) )
            ,   TraceStep::Close( k, s ) =>
                {
                    if stack.pop() != Some( ( *k, s.clone() ) )
                    {
                        return false;
                    }
                }
            ,   TraceStep::Basic( _ ) => {}
            }
        }

        stack.is_empty()
    }

    #[test]
    fn positional_args_keep_order()
    {
        let m = call()
            .append( TypeValue::string( "org.bluez.Adapter1" ) )
            .append( TypeValue::string( "Powered" ) )
            .append_variant( TypeValue::Boolean( true ) )
            .build()
            .unwrap();

        assert_eq!( m.member(), "Set" );
        assert_eq!( m.signature().unwrap(), "ssv" );
        assert_eq!(
            m.args()
        ,   &[
                TypeValue::string( "org.bluez.Adapter1" )
            ,   TypeValue::string( "Powered" )
            ,   TypeValue::variant( TypeValue::Boolean( true ) )
            ]
        );
        assert_eq!(
            m.trace()
        ,   &[
                TraceStep::Basic( TypeSignature::from( "s" ) )
            ,   TraceStep::Basic( TypeSignature::from( "s" ) )
            ,   TraceStep::Open( ContainerKind::Variant, TypeSignature::from( "b" ) )
            ,   TraceStep::Basic( TypeSignature::from( "b" ) )
            ,   TraceStep::Close( ContainerKind::Variant, TypeSignature::from( "b" ) )
            ]
        );
    }

    #[test]
    fn dict_trace_is_balanced()
    {
        let m = call()
            .append( TypeValue::object_path( "/com/example/Advertisement1" ) )
            .append_dict(
                vec![
                    ( String::from( "Type" ), TypeValue::string( "peripheral" ) )
                ,   ( String::from( "ServiceUUIDs" ), TypeValue::string_array( &[ "0000180d-0000-1000-8000-00805f9b34fb" ] ) )
                ]
            )
            .build()
            .unwrap();

        assert_eq!( m.signature().unwrap(), "oa{sv}" );
        assert!( is_balanced( m.trace() ) );

        let opens = m.trace().iter().filter( | x | matches!( x, TraceStep::Open( _, _ ) ) ).count();
        let closes = m.trace().iter().filter( | x | matches!( x, TraceStep::Close( _, _ ) ) ).count();

        // a{sv}, 2 x ( {sv}, v ), as
        assert_eq!( opens, 6 );
        assert_eq!( closes, 6 );
    }

    #[test]
    fn manual_dict_matches_append_dict()
    {
        let manual = call()
            .open_array( "{sv}" )
            .open_dict_entry()
            .append( TypeValue::string( "Type" ) )
            .open_variant( "s" )
            .append( TypeValue::string( "peripheral" ) )
            .close()
            .close()
            .close()
            .build()
            .unwrap();

        let helper = call()
            .append_dict( vec![ ( String::from( "Type" ), TypeValue::string( "peripheral" ) ) ] )
            .build()
            .unwrap();

        assert_eq!( manual, helper );
    }

    #[test]
    fn build_with_open_container_fails()
    {
        let r = call()
            .append( TypeValue::string( "org.bluez.Adapter1" ) )
            .open_variant( "b" )
            .append( TypeValue::Boolean( false ) )
            .build();

        match r
        {
            Err( BtError::MessageConstruction( ConstructionError::IncompleteContainer { depth, .. } ) ) =>
            {
                assert_eq!( depth, 1 );
            }
        ,   x => panic!( "unexpected {:?}", x )
        }
    }

    #[test]
    fn close_without_open_fails()
    {
        assert_eq!(
            call().close().build()
        ,   Err( BtError::MessageConstruction( ConstructionError::UnbalancedClose ) )
        );
    }

    #[test]
    fn variant_holds_one_value()
    {
        let r = call()
            .open_variant( "s" )
            .append( TypeValue::string( "a" ) )
            .append( TypeValue::string( "b" ) )
            .close()
            .build();

        assert!( matches!( r, Err( BtError::MessageConstruction( ConstructionError::MisplacedValue( _ ) ) ) ) );
    }

    #[test]
    fn variant_rejects_other_type()
    {
        let r = call()
            .open_variant( "s" )
            .append( TypeValue::Boolean( true ) )
            .close()
            .build();

        assert!( matches!( r, Err( BtError::MessageConstruction( ConstructionError::MisplacedValue( _ ) ) ) ) );
    }

    #[test]
    fn array_rejects_other_type()
    {
        let r = call()
            .open_array( "s" )
            .append( TypeValue::string( "a" ) )
            .append( TypeValue::UInt32( 1 ) )
            .close()
            .build();

        assert!( matches!( r, Err( BtError::MessageConstruction( ConstructionError::HeterogeneousArray { .. } ) ) ) );
    }

    #[test]
    fn dict_entry_needs_array()
    {
        let r = call().open_dict_entry().build();
        assert!( matches!( r, Err( BtError::MessageConstruction( ConstructionError::MisplacedValue( _ ) ) ) ) );

        let r = call().append( TypeValue::dict_entry( "k", TypeValue::variant( TypeValue::Boolean( true ) ) ) ).build();
        assert!( matches!( r, Err( BtError::MessageConstruction( ConstructionError::MisplacedValue( _ ) ) ) ) );
    }

    #[test]
    fn dict_entry_key_is_string()
    {
        let r = call()
            .open_array( "{sv}" )
            .open_dict_entry()
            .append( TypeValue::UInt32( 7 ) )
            .build();

        assert!( matches!( r, Err( BtError::MessageConstruction( ConstructionError::MisplacedValue( _ ) ) ) ) );
    }

    #[test]
    fn first_error_wins()
    {
        let r = call()
            .close()
            .append( TypeValue::object_path( "not/a/path" ) )
            .build();

        assert_eq!( r, Err( BtError::MessageConstruction( ConstructionError::UnbalancedClose ) ) );
    }

    #[test]
    fn invalid_header_is_reported()
    {
        let r = MessageBuilder::new_call( "org.bluez", "/org/bluez/hci0", "org.bluez.Adapter1", "Start.Discovery" ).build();
        assert!( matches!( r, Err( BtError::MessageConstruction( ConstructionError::InvalidHeader( _ ) ) ) ) );

        let r = MessageBuilder::new_call( "org.bluez", "hci0", "org.bluez.Adapter1", "StartDiscovery" ).build();
        assert!( matches!( r, Err( BtError::MessageConstruction( ConstructionError::InvalidObjectPath( _ ) ) ) ) );
    }

    #[test]
    fn element_signature_must_be_one_type()
    {
        let r = call().append( TypeValue::Array( TypeSignature::from( "" ), vec![] ) ).build();
        assert_eq!( r, Err( BtError::MessageConstruction( ConstructionError::InvalidSignature( String::from( "" ) ) ) ) );

        let r = call().append( TypeValue::Array( TypeSignature::from( "ss" ), vec![] ) ).build();
        assert_eq!( r, Err( BtError::MessageConstruction( ConstructionError::InvalidSignature( String::from( "ss" ) ) ) ) );

        let r = call().open_array( "ss" ).close().build();
        assert_eq!( r, Err( BtError::MessageConstruction( ConstructionError::InvalidSignature( String::from( "ss" ) ) ) ) );

        let r = call().open_variant( "sb" ).close().build();
        assert_eq!( r, Err( BtError::MessageConstruction( ConstructionError::InvalidSignature( String::from( "sb" ) ) ) ) );
    }
}
