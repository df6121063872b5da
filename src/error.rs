use thiserror::Error;

use lscell_codec::CodecError;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CellError {
    #[error("cell key must not be empty")]
    EmptyKey,
    #[error(transparent)]
    Encode(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
