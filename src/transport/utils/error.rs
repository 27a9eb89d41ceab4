// Translation of backend failures into transport-level or filesystem-level errors
use crate::error::{Error, Step};

/// Convert a backend error into our unified Error, tagged with the failing step.
pub trait IntoTransportError {
    fn into_transport_error(self, step: Step, transport: &'static str) -> Error;
}

impl IntoTransportError for Error {
    fn into_transport_error(self, _step: Step, _transport: &'static str) -> Error {
        self
    }
}

impl IntoTransportError for opendal::Error {
    fn into_transport_error(self, step: Step, transport: &'static str) -> Error {
        if is_unreachable(&self) {
            Error::TransportUnavailable {
                step,
                transport,
                message: self.to_string(),
            }
        } else {
            Error::RemoteWrite {
                step,
                message: self.to_string(),
            }
        }
    }
}

/// Failures to spawn or talk to a helper process mean the bridge itself is down.
impl IntoTransportError for std::io::Error {
    fn into_transport_error(self, step: Step, transport: &'static str) -> Error {
        Error::TransportUnavailable {
            step,
            transport,
            message: self.to_string(),
        }
    }
}

/// Connection failures and gateway 5xx responses are flagged temporary by OpenDAL;
/// a misconfigured backend is no more reachable than a dead one.
fn is_unreachable(err: &opendal::Error) -> bool {
    err.is_temporary()
        || err.kind() == opendal::ErrorKind::ConfigInvalid
        || err.to_string().contains("Connection refused")
}

/// Attach step context to any backend result.
pub trait StepContext<T> {
    fn at_step(self, step: Step, transport: &'static str) -> Result<T, Error>;
}

impl<T, E: IntoTransportError> StepContext<T> for Result<T, E> {
    fn at_step(self, step: Step, transport: &'static str) -> Result<T, Error> {
        self.map_err(|e| e.into_transport_error(step, transport))
    }
}
