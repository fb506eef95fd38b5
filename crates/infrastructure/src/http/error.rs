use std::error::Error as StdError;

use rustls::CertificateError;
use tracing::warn;

use linkpatrol_domain::{CertificateProblem, HttpFailure, ProbeError};

/// Collapse a reqwest error into the probe-error taxonomy by walking its
/// cause chain for the first recognizable leaf. Unrecognized shapes are
/// logged with the whole chain and become `Unknown`, never a crash.
pub fn classify_reqwest_error(url: &str, error: &reqwest::Error) -> ProbeError {
    if error.is_timeout() {
        return ProbeError::Timeout;
    }
    if error.is_builder() {
        return ProbeError::InvalidUrl;
    }

    if let Some(probe) = classify_chain(error) {
        return probe;
    }

    let detail = format_chain(error);
    warn!(%url, %detail, "cannot classify check error");
    ProbeError::Unknown { detail }
}

fn classify_chain(error: &(dyn StdError + 'static)) -> Option<ProbeError> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);

    while let Some(e) = current {
        // Failures synthesized by our own resolver hook resurface here
        // wrapped in the client's connect error.
        if let Some(probe) = e.downcast_ref::<ProbeError>() {
            return Some(probe.clone());
        }

        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if let Some(errno) = io.raw_os_error() {
                return Some(ProbeError::Os { errno });
            }
            match io.kind() {
                std::io::ErrorKind::ConnectionReset => {
                    return Some(ProbeError::Os {
                        errno: libc::ECONNRESET,
                    })
                }
                std::io::ErrorKind::ConnectionRefused => {
                    return Some(ProbeError::Os {
                        errno: libc::ECONNREFUSED,
                    })
                }
                std::io::ErrorKind::ConnectionAborted => {
                    return Some(ProbeError::Os {
                        errno: libc::ECONNABORTED,
                    })
                }
                std::io::ErrorKind::TimedOut => return Some(ProbeError::Timeout),
                _ => {}
            }
        }

        if let Some(hyper) = e.downcast_ref::<hyper::Error>() {
            if hyper.is_incomplete_message() {
                return Some(ProbeError::Http(HttpFailure::ServerDisconnected));
            }
            if hyper.is_parse() || hyper.is_parse_status() || hyper.is_parse_too_large() {
                return Some(ProbeError::Http(HttpFailure::BadMessage));
            }
            if hyper.is_timeout() {
                return Some(ProbeError::Timeout);
            }
        }

        if let Some(tls) = e.downcast_ref::<rustls::Error>() {
            return Some(ProbeError::Tls(certificate_problem(tls)));
        }

        current = e.source();
    }

    None
}

fn certificate_problem(error: &rustls::Error) -> CertificateProblem {
    match error {
        rustls::Error::InvalidCertificate(cert_error) => match cert_error {
            CertificateError::Expired | CertificateError::ExpiredContext { .. } => {
                CertificateProblem::Expired
            }
            CertificateError::NotValidForName
            | CertificateError::NotValidForNameContext { .. } => {
                CertificateProblem::HostnameMismatch
            }
            // rustls reports both a self-signed leaf and a missing
            // intermediate as an unknown issuer.
            CertificateError::UnknownIssuer => CertificateProblem::IncompleteChain,
            _ => CertificateProblem::Other,
        },
        _ => CertificateProblem::Other,
    }
}

fn format_chain(error: &(dyn StdError + 'static)) -> String {
    let mut detail = error.to_string();
    let mut current = error.source();
    while let Some(e) = current {
        detail.push_str(": caused by: ");
        detail.push_str(&e.to_string());
        current = e.source();
    }
    detail
}
