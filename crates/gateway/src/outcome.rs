/// Result of a gateway call, tagged by what the caller should do next.
///
/// `Unauthorized` means the session could not be recovered by a token
/// refresh and the user has to sign in again; the other non-success
/// variants are retryable or reportable as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome<T> {
    Success(T),
    Unauthorized,
    NetworkError(String),
    ServerError(u16),
}

impl<T> GatewayOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, GatewayOutcome::Success(_))
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            GatewayOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GatewayOutcome<U> {
        match self {
            GatewayOutcome::Success(value) => GatewayOutcome::Success(f(value)),
            GatewayOutcome::Unauthorized => GatewayOutcome::Unauthorized,
            GatewayOutcome::NetworkError(reason) => GatewayOutcome::NetworkError(reason),
            GatewayOutcome::ServerError(status) => GatewayOutcome::ServerError(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_transforms_only_the_success_payload() {
        let outcome: GatewayOutcome<i64> = GatewayOutcome::Success(21);
        assert_eq!(outcome.map(|value| value * 2), GatewayOutcome::Success(42));

        let outcome: GatewayOutcome<i64> = GatewayOutcome::ServerError(500);
        assert_eq!(
            outcome.map(|value| value * 2),
            GatewayOutcome::ServerError(500)
        );
    }

    #[test]
    fn into_success_drops_failures() {
        let outcome: GatewayOutcome<&str> = GatewayOutcome::Unauthorized;
        assert_eq!(outcome.into_success(), None);
    }
}
