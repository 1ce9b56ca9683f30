//  vim:set ts=4 sw=4 sts=0 fileencoding=utf-8:
//  ----------------------------------------------------------------------------
/*
    @author     zuntan
*/

///
///

use thiserror::Error;

///
pub type Result< T > = std::result::Result< T, BtError >;

///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BtError
{
    #[error( "connection error: {0}" )]
    Connection( String )

,   #[error( "message construction error: {0}" )]
    MessageConstruction( #[from] ConstructionError )

,   #[error( "transport error: {0}" )]
    Transport( String )

,   #[error( "decode error: {0}" )]
    Decode( #[from] DecodeError )
}

/// Invalid container nesting or malformed argument values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError
{
    #[error( "{depth} container(s) still open, innermost {innermost}" )]
    IncompleteContainer { depth : usize, innermost : String }

,   #[error( "array of `{expected}` can not hold `{found}`" )]
    HeterogeneousArray { expected : String, found : String }

,   #[error( "invalid object path `{0}`" )]
    InvalidObjectPath( String )

,   #[error( "invalid signature `{0}`" )]
    InvalidSignature( String )

,   #[error( "close without open container" )]
    UnbalancedClose

,   #[error( "{0}" )]
    MisplacedValue( String )

,   #[error( "invalid message header: {0}" )]
    InvalidHeader( String )
}

///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError
{
    #[error( "reply has no arguments" )]
    EmptyReply

,   #[error( "expected variant, found `{0}`" )]
    UnexpectedShape( String )

,   #[error( "unexpected type `{0}`" )]
    UnexpectedType( String )
}
