//! Reading large id sets in fixed-size chunks.
//!
//! Dashboards fetch order lines, products and payments by id after reading
//! the orders themselves. Sending tens of thousands of ids in one `in`
//! condition produces oversized request bodies, so ids go out in chunks of
//! `ID_CHUNK_SIZE`, one `search_read` per chunk, in order.

use tracing::debug;

use crate::client::OdooClient;
use crate::error::RpcError;
use crate::http::Transport;
use crate::query::{Domain, SearchOptions};
use crate::value::Value;

pub const ID_CHUNK_SIZE: usize = 1000;

/// `search_read` every record whose id is in `ids`, `ID_CHUNK_SIZE` ids per
/// request. Results are concatenated in chunk order. An empty `ids` sends
/// nothing. The first failing chunk aborts the whole read.
#[allow(clippy::too_many_arguments)]
pub fn read_in_chunks<T: Transport>(
    client: &OdooClient,
    transport: &T,
    uid: i64,
    api_key: &str,
    model: &str,
    ids: &[i64],
    fields: &[&str],
    options: &SearchOptions,
) -> Result<Vec<Value>, RpcError> {
    let mut records = Vec::with_capacity(ids.len());
    for (index, chunk) in ids.chunks(ID_CHUNK_SIZE).enumerate() {
        debug!(model, chunk = index, size = chunk.len(), "reading id chunk");
        let domain = Domain::new().filter("id", "in", chunk.to_vec());
        let batch = client.search_read(transport, uid, api_key, model, domain, fields, options)?;
        records.extend(batch);
    }
    Ok(records)
}
