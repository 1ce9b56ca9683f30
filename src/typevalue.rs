//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

/// Values and type signatures of dbus method arguments.
///
/// https://dbus.freedesktop.org/doc/dbus-specification.html#type-system

use std::fmt;

use dbus::strings::Signature;

use crate::error::{ Result, ConstructionError };

const OBJECT_PATH_PATTERN : &str = r"^(/|(/[A-Za-z0-9_]+)+)$";

///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeSignature( String );

impl TypeSignature
{
    pub fn new( sig : &str ) -> TypeSignature
    {
        TypeSignature( String::from( sig ) )
    }

    pub fn as_str( &self ) -> &str
    {
        &self.0
    }
}

impl From< &str > for TypeSignature
{
    fn from( sig : &str ) -> TypeSignature
    {
        TypeSignature::new( sig )
    }
}

impl fmt::Display for TypeSignature
{
    fn fmt( &self, f : &mut fmt::Formatter<'_> ) -> fmt::Result
    {
        f.write_str( &self.0 )
    }
}

///
#[derive(Debug, Clone, PartialEq)]
pub enum TypeValue
{
    String( String )
,   Boolean( bool )
,   Byte( u8 )
,   Int16( i16 )
,   UInt16( u16 )
,   Int32( i32 )
,   UInt32( u32 )
,   Int64( i64 )
,   UInt64( u64 )
,   Double( f64 )
,   ObjectPath( String )
,   /// element signature, items
    Array( TypeSignature, Vec< TypeValue > )
,   DictEntry( String, Box< TypeValue > )
,   Variant( Box< TypeValue > )
}

impl TypeValue
{
    pub fn string( s : &str ) -> TypeValue
    {
        TypeValue::String( String::from( s ) )
    }

    pub fn object_path( path : &str ) -> TypeValue
    {
        TypeValue::ObjectPath( String::from( path ) )
    }

    pub fn variant( inner : TypeValue ) -> TypeValue
    {
        TypeValue::Variant( Box::new( inner ) )
    }

    pub fn dict_entry( key : &str, value : TypeValue ) -> TypeValue
    {
        TypeValue::DictEntry( String::from( key ), Box::new( value ) )
    }

    pub fn string_array< S : AsRef< str > >( items : &[ S ] ) -> TypeValue
    {
        TypeValue::Array(
            TypeSignature::from( "s" )
        ,   items.iter().map( | x | TypeValue::string( x.as_ref() ) ).collect()
        )
    }

    /// `a{sv}`
    pub fn dict( entries : Vec< ( String, TypeValue ) > ) -> TypeValue
    {
        TypeValue::Array(
            TypeSignature::from( "{sv}" )
        ,   entries.into_iter()
                .map( | ( k, v ) | TypeValue::DictEntry( k, Box::new( TypeValue::variant( v ) ) ) )
                .collect()
        )
    }

    pub fn as_bool( &self ) -> Option< bool >
    {
        match self
        {
            TypeValue::Boolean( x ) => Some( *x )
        ,   _ => None
        }
    }

    /// Short name used in diagnostics.
    pub fn kind_name( &self ) -> &'static str
    {
        match self
        {
            TypeValue::String( _ )      => "string"
        ,   TypeValue::Boolean( _ )     => "boolean"
        ,   TypeValue::Byte( _ )        => "byte"
        ,   TypeValue::Int16( _ )       => "int16"
        ,   TypeValue::UInt16( _ )      => "uint16"
        ,   TypeValue::Int32( _ )       => "int32"
        ,   TypeValue::UInt32( _ )      => "uint32"
        ,   TypeValue::Int64( _ )       => "int64"
        ,   TypeValue::UInt64( _ )      => "uint64"
        ,   TypeValue::Double( _ )      => "double"
        ,   TypeValue::ObjectPath( _ )  => "object_path"
        ,   TypeValue::Array( _, _ )    => "array"
        ,   TypeValue::DictEntry( _, _ ) => "dict_entry"
        ,   TypeValue::Variant( _ )     => "variant"
        }
    }
}

pub fn is_object_path( path : &str ) -> bool
{
    lazy_static!
    {
        static ref RE : regex::Regex =
            regex::Regex::new( OBJECT_PATH_PATTERN ).unwrap();
    }

    RE.is_match( path )
}

pub fn check_object_path( path : &str ) -> Result< () >
{
    if is_object_path( path )
    {
        Ok( () )
    }
    else
    {
        Err( ConstructionError::InvalidObjectPath( String::from( path ) ).into() )
    }
}

/// Length of the first complete type in `sig`.
fn complete_type_len( sig : &[ u8 ] ) -> Option< usize >
{
    match sig.first()?
    {
        b'a' => complete_type_len( &sig[ 1 .. ] ).map( | n | n + 1 )
    ,   b'(' =>
        {
            let mut pos = 1;

            while *sig.get( pos )? != b')'
            {
                pos += complete_type_len( &sig[ pos .. ] )?;
            }

            if pos == 1 { None } else { Some( pos + 1 ) }
        }
    ,   b'{' =>
        {
            let k = complete_type_len( &sig[ 1 .. ] )?;
            let v = complete_type_len( &sig[ 1 + k .. ] )?;

            if *sig.get( 1 + k + v )? == b'}' { Some( k + v + 2 ) } else { None }
        }
    ,   b'y' | b'b' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'd' | b'h' | b's' | b'o' | b'g' | b'v' => Some( 1 )
    ,   _ => None
    }
}

/// `sig` must be exactly one complete type that libdbus accepts.
pub fn check_single_signature( sig : &str ) -> Result< () >
{
    if complete_type_len( sig.as_bytes() ) == Some( sig.len() ) && Signature::new( sig ).is_ok()
    {
        Ok( () )
    }
    else
    {
        Err( ConstructionError::InvalidSignature( String::from( sig ) ).into() )
    }
}

/// Element of an array; dict entries are only valid here.
pub fn check_element_signature( elem : &str ) -> Result< () >
{
    if complete_type_len( elem.as_bytes() ) == Some( elem.len() ) && Signature::new( format!( "a{}", elem ) ).is_ok()
    {
        Ok( () )
    }
    else
    {
        Err( ConstructionError::InvalidSignature( String::from( elem ) ).into() )
    }
}

/// Complete signature of one value. Validates array homogeneity and object paths on the way down.
pub fn signature_of( value : &TypeValue ) -> Result< TypeSignature >
{
    let sig =
        match value
        {
            TypeValue::String( _ )      => String::from( "s" )
        ,   TypeValue::Boolean( _ )     => String::from( "b" )
        ,   TypeValue::Byte( _ )        => String::from( "y" )
        ,   TypeValue::Int16( _ )       => String::from( "n" )
        ,   TypeValue::UInt16( _ )      => String::from( "q" )
        ,   TypeValue::Int32( _ )       => String::from( "i" )
        ,   TypeValue::UInt32( _ )      => String::from( "u" )
        ,   TypeValue::Int64( _ )       => String::from( "x" )
        ,   TypeValue::UInt64( _ )      => String::from( "t" )
        ,   TypeValue::Double( _ )      => String::from( "d" )
        ,   TypeValue::ObjectPath( p ) =>
            {
                check_object_path( p )?;
                String::from( "o" )
            }
        ,   TypeValue::Array( elem, items ) =>
            {
                check_element_signature( elem.as_str() )?;

                for x in items
                {
                    let found = signature_of( x )?;

                    if found != *elem
                    {
                        return Err(
                            ConstructionError::HeterogeneousArray
                            {
                                expected    : elem.to_string()
                            ,   found       : found.to_string()
                            }.into()
                        );
                    }
                }

                format!( "a{}", elem )
            }
        ,   TypeValue::DictEntry( _, v ) =>
            {
                format!( "{{s{}}}", signature_of( v )? )
            }
        ,   TypeValue::Variant( inner ) =>
            {
                signature_of( inner )?;
                String::from( "v" )
            }
        };

    Ok( TypeSignature( sig ) )
}
