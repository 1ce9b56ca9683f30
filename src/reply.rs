//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

/// Reply decoding for single property lookups (`v`).
///

use crate::error::{ Result, DecodeError };
use crate::typevalue::TypeValue;
use crate::msgbuild::Message;

/// The value inside the first argument, which must be a variant.
pub fn decode_single_variant( reply : &Message ) -> Result< &TypeValue >
{
    match reply.args().first()
    {
        None =>
        {
            Err( DecodeError::EmptyReply.into() )
        }
    ,   Some( TypeValue::Variant( inner ) ) =>
        {
            Ok( &**inner )
        }
    ,   Some( x ) =>
        {
            Err( DecodeError::UnexpectedShape( String::from( x.kind_name() ) ).into() )
        }
    }
}

pub fn decode_single_variant_string( reply : &Message ) -> Result< String >
{
    match decode_single_variant( reply )?
    {
        TypeValue::String( x ) => Ok( String::from( x ) )
    ,   x => Err( DecodeError::UnexpectedType( String::from( x.kind_name() ) ).into() )
    }
}

pub fn decode_single_variant_bool( reply : &Message ) -> Result< bool >
{
    let x = decode_single_variant( reply )?;

    x.as_bool().ok_or( DecodeError::UnexpectedType( String::from( x.kind_name() ) ).into() )
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::error::BtError;

    #[test]
    fn empty_reply()
    {
        let reply = Message::method_return( vec![] );

        assert_eq!( decode_single_variant_string( &reply ), Err( BtError::Decode( DecodeError::EmptyReply ) ) );
    }

    #[test]
    fn plain_string_is_not_a_variant()
    {
        let reply = Message::method_return( vec![ TypeValue::string( "AA:BB:CC:DD:EE:FF" ) ] );

        assert_eq!(
            decode_single_variant_string( &reply )
        ,   Err( BtError::Decode( DecodeError::UnexpectedShape( String::from( "string" ) ) ) )
        );
    }

    #[test]
    fn variant_string()
    {
        let reply = Message::method_return( vec![ TypeValue::variant( TypeValue::string( "AA:BB:CC:DD:EE:FF" ) ) ] );

        assert_eq!( decode_single_variant_string( &reply ).unwrap(), "AA:BB:CC:DD:EE:FF" );
    }

    #[test]
    fn variant_of_other_type()
    {
        let reply = Message::method_return( vec![ TypeValue::variant( TypeValue::Boolean( true ) ) ] );

        assert_eq!(
            decode_single_variant_string( &reply )
        ,   Err( BtError::Decode( DecodeError::UnexpectedType( String::from( "boolean" ) ) ) )
        );
        assert_eq!( decode_single_variant_bool( &reply ), Ok( true ) );
    }

    #[test]
    fn bool_from_text_variant_fails()
    {
        let reply = Message::method_return( vec![ TypeValue::variant( TypeValue::string( "yes" ) ) ] );

        assert_eq!(
            decode_single_variant_bool( &reply )
        ,   Err( BtError::Decode( DecodeError::UnexpectedType( String::from( "string" ) ) ) )
        );
    }

    #[test]
    fn only_first_argument_counts()
    {
        let reply =
            Message::method_return(
                vec![
                    TypeValue::variant( TypeValue::string( "first" ) )
                ,   TypeValue::string( "second" )
                ]
            );

        assert_eq!( decode_single_variant_string( &reply ).unwrap(), "first" );
    }
}
