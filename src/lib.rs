//! bramble — a PEG parser-combinator runtime with explicit, rewindable state.
//!
//! Grammars are immutable graphs of combinator nodes built through the
//! [`grammar`] surface; the [`engine`] runs a graph against text or token
//! [`input`], threading a transactional [`state`] (value stack plus a
//! reversible side-effect [`log`]) that backtracking rewinds exactly. The
//! [`wellformed`] analysis rejects unprotected left recursion and nullable
//! repetition before a parse starts.

pub use im;

pub use crate::combinator::{ActionScope, Parser, ParserRef};
pub use crate::engine::{run, run_str, run_with_store, ParseResult};
pub use crate::errors::{Fatal, GrammarFault};
pub use crate::fixture::Fixture;
pub use crate::input::{Input, Token};
pub use crate::log::{LogEntry, SideEffectLog, Store};
pub use crate::metrics::{ParseMetrics, ParserMetrics};
pub use crate::options::{MetricsSink, ParseOptions};
pub use crate::state::{CallFrame, Parse};
pub use crate::value::Value;

pub mod combinator;
pub mod engine;
pub mod errors;
pub mod fixture;
pub mod grammar;
pub mod input;
pub mod log;
pub mod metrics;
pub mod options;
pub mod state;
pub mod value;
pub mod wellformed;
