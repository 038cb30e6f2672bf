//! Series creation
//!
//! Drives a creation request through its states:
//!
//! ```text
//! START -> PARSED -> VALIDATED -> KEY_CHECKED -> BOUND
//! ```
//!
//! with FAILED reachable from every non-terminal state. Parsing and
//! validation touch nothing outside the request; the only mutation is the
//! final atomic bind, so a failure at any stage leaves the namespace
//! exactly as it was.

use crate::command::args::parse_create_args;
use crate::command::Reply;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::series::Series;
use crate::store::{MemoryStore, Value};

/// Handle `TEMPO.CREATE <key> [<descriptor>] [OPTION value ...]`
///
/// On success the key's introspected type becomes the series type tag; on
/// failure the request reports exactly one typed error and no state
/// changes.
pub fn create(store: &mut MemoryStore, config: &Config, args: &[String]) -> EngineResult<Reply> {
    // START -> PARSED -> VALIDATED
    let request = parse_create_args(args, config)?;

    // VALIDATED -> KEY_CHECKED: existence is type-agnostic
    if store.exists(&request.key) {
        return Err(EngineError::KeyAlreadyExists);
    }

    // KEY_CHECKED -> BOUND: construct and bind in one step
    let descriptor = request.descriptor.to_string();
    let series = Series::new(request.descriptor, request.options);
    store.bind_if_absent(request.key.clone(), Value::Series(series))?;

    tracing::debug!(
        key = %String::from_utf8_lossy(&request.key),
        descriptor = %descriptor,
        "created series"
    );
    Ok(Reply::Ok)
}
