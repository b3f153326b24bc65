// HTTP Status Codes

macro_rules! http_statuses {
    ($($variant:ident = $code:literal => $reason:literal,)+) => {
        /// HTTP status codes produced by the framework and its handlers
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HttpStatus {
            $($variant = $code,)+
        }

        impl HttpStatus {
            /// Get the reason phrase for the status code
            pub fn reason(&self) -> &'static str {
                match self {
                    $(HttpStatus::$variant => $reason,)+
                }
            }

            /// Create status from u16 code
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(HttpStatus::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

http_statuses! {
    Ok = 200 => "OK",
    Created = 201 => "Created",
    Accepted = 202 => "Accepted",
    NoContent = 204 => "No Content",

    MovedPermanently = 301 => "Moved Permanently",
    Found = 302 => "Found",
    SeeOther = 303 => "See Other",
    NotModified = 304 => "Not Modified",
    TemporaryRedirect = 307 => "Temporary Redirect",
    PermanentRedirect = 308 => "Permanent Redirect",

    BadRequest = 400 => "Bad Request",
    Unauthorized = 401 => "Unauthorized",
    Forbidden = 403 => "Forbidden",
    NotFound = 404 => "Not Found",
    MethodNotAllowed = 405 => "Method Not Allowed",
    NotAcceptable = 406 => "Not Acceptable",
    RequestTimeout = 408 => "Request Timeout",
    Conflict = 409 => "Conflict",
    Gone = 410 => "Gone",
    PayloadTooLarge = 413 => "Payload Too Large",
    UnsupportedMediaType = 415 => "Unsupported Media Type",
    UnprocessableEntity = 422 => "Unprocessable Entity",
    TooManyRequests = 429 => "Too Many Requests",

    InternalServerError = 500 => "Internal Server Error",
    NotImplemented = 501 => "Not Implemented",
    BadGateway = 502 => "Bad Gateway",
    ServiceUnavailable = 503 => "Service Unavailable",
    GatewayTimeout = 504 => "Gateway Timeout",
}

impl HttpStatus {
    /// Get the numeric status code
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code())
    }

    /// Check if status is client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code())
    }

    /// Check if status is server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code())
    }

    /// Reason phrase for any code, falling back to the class name
    pub fn reason_for(code: u16) -> &'static str {
        match HttpStatus::from_code(code) {
            Some(status) => status.reason(),
            None => match code {
                100..=199 => "Informational",
                200..=299 => "Success",
                300..=399 => "Redirection",
                400..=499 => "Client Error",
                _ => "Server Error",
            },
        }
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_reasons() {
        assert_eq!(HttpStatus::NotFound.code(), 404);
        assert_eq!(HttpStatus::MethodNotAllowed.reason(), "Method Not Allowed");
        assert_eq!(HttpStatus::from_code(400), Some(HttpStatus::BadRequest));
        assert_eq!(HttpStatus::from_code(999), None);
    }

    #[test]
    fn test_reason_for_unknown_code() {
        assert_eq!(HttpStatus::reason_for(418), "Client Error");
        assert_eq!(HttpStatus::reason_for(500), "Internal Server Error");
    }

    #[test]
    fn test_display() {
        assert_eq!(HttpStatus::Ok.to_string(), "200 OK");
    }
}
