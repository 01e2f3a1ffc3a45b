//! # stevedore-core
//!
//! The schema-neutral conversion engine.
//!
//! Handles:
//! - **Value**: closed tagged variant for dynamically-typed field values.
//! - **Model**: canonical service/system representation all conversions
//!   pass through.
//! - **Codec**: explicit per-schema registry of field conversion functions.
//! - **Command**: invertible shell-style tokenization of command strings.
//! - **Ident**: injectable unique-identifier generation.
//! - **Serialize**: deterministic, byte-stable JSON and YAML rendering.
//! - **Transform**: the three-phase ingest/validate/emit transformer
//!   contract and the conversion pipeline.

pub mod codec;
pub mod command;
pub mod ident;
pub mod model;
pub mod serialize;
pub mod transform;
pub mod value;

pub use codec::{CodecRegistry, FieldCodec};
pub use ident::{FixedIdGenerator, IdGenerator, SequenceIdGenerator, UuidGenerator};
pub use model::{CanonicalService, CanonicalSystem};
pub use transform::{Transformer, convert};
pub use value::{Value, ValueMap};
