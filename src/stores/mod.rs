//! Domain state stores: an in-memory list per entity kind, patched from
//! server-canonical responses after each operation.
//!
//! All three follow one pattern: `list` replaces the list wholesale from a
//! single server response, `create` appends the returned entity, `update`
//! replaces by id, `delete` filters locally by id. Every operation takes a
//! `CancelToken`; a cancelled token means no request and no state patch.

pub mod categories;
pub mod posts;
pub mod users;
