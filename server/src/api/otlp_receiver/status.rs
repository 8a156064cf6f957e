//! Consumer error to gRPC status translation
//!
//! Every failure ends in a status with defined OTLP retry behavior, never
//! `Unknown`:
//!
//! | Consumer error                 | Status                   |
//! |--------------------------------|--------------------------|
//! | pre-bound status               | unchanged                |
//! | permanent                      | `Internal`               |
//! | non-permanent / unclassified   | `Unavailable` (retry)    |

use tonic::{Code, Status};

use crate::domain::ConsumerError;

/// Map a consumer failure to the status returned to the exporter
pub fn status_from_error(err: &ConsumerError) -> Status {
    if let Some(status) = err.grpc_status() {
        return status.clone();
    }

    // Permanent without a bound status is a server-side failure
    let code = if err.is_permanent() {
        Code::Internal
    } else {
        Code::Unavailable
    };
    Status::new(code, err.to_string())
}
