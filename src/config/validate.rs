// The miette/thiserror derive macros generate code that triggers false
// positive unused_assignments warnings on enum variant fields.
#![allow(unused_assignments)]

use std::collections::BTreeMap;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::config::model::DevhostConfig;

// ---------------------------------------------------------------------------
// Validation errors rendered as miette diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigDiagnostic {
    #[error("service `{service}` has an empty image")]
    #[diagnostic(code(devhost::empty_image))]
    EmptyImage {
        #[source_code]
        src: NamedSource<String>,
        #[label("image is empty")]
        span: SourceSpan,
        service: String,
    },

    #[error("port {port} is used by multiple services: {services:?}")]
    #[diagnostic(code(devhost::duplicate_port))]
    DuplicatePort {
        #[source_code]
        src: NamedSource<String>,
        #[label("duplicate port")]
        span: SourceSpan,
        port: u16,
        services: Vec<String>,
    },

    #[error("handle `{handle}` of service `{service}` must start with `/`")]
    #[diagnostic(code(devhost::invalid_handle))]
    InvalidHandle {
        #[source_code]
        src: NamedSource<String>,
        #[label("not an absolute path")]
        span: SourceSpan,
        service: String,
        handle: String,
    },

    #[error("handle `{handle}` is claimed by multiple services: {services:?}")]
    #[diagnostic(code(devhost::duplicate_handle))]
    DuplicateHandle {
        #[source_code]
        src: NamedSource<String>,
        #[label("duplicate handle")]
        span: SourceSpan,
        handle: String,
        services: Vec<String>,
    },

    #[error("service `{service}` is proxied but has no {missing}")]
    #[diagnostic(
        code(devhost::incomplete_proxy),
        help("proxied services need both `handle` and `port`")
    )]
    IncompleteProxy {
        #[source_code]
        src: NamedSource<String>,
        #[label("proxy = true")]
        span: SourceSpan,
        service: String,
        missing: &'static str,
    },

    #[error("service `{service}` has a relative health endpoint but no port")]
    #[diagnostic(
        code(devhost::health_without_port),
        help("set `port`, or give `health_endpoint` as an absolute URL")
    )]
    HealthWithoutPort {
        #[source_code]
        src: NamedSource<String>,
        #[label("resolved against an unknown address")]
        span: SourceSpan,
        service: String,
    },

    #[error("hasura service `{service}` is not declared")]
    #[diagnostic(code(devhost::unknown_hasura_service))]
    UnknownHasuraService {
        #[source_code]
        src: NamedSource<String>,
        #[label("no such service")]
        span: SourceSpan,
        #[help]
        advice: String,
        service: String,
    },
}

// ---------------------------------------------------------------------------
// Source span helpers
// ---------------------------------------------------------------------------

/// Find the byte offset of a TOML table header like `[services.hasura]`.
fn find_table_span(source: &str, section: &str, name: &str) -> SourceSpan {
    let patterns = [
        format!("[{}.{}]", section, name),
        format!("[{}.{}", section, name), // nested tables like [services.hasura.env]
    ];

    for pat in &patterns {
        if let Some(pos) = source.find(pat) {
            let name_start = pos + 1 + section.len() + 1; // skip '[', section, '.'
            return (name_start, name.len()).into();
        }
    }

    if let Some(pos) = source.find(name) {
        return (pos, name.len()).into();
    }

    (0, 0).into()
}

/// Find the byte offset of a specific field value in a TOML section.
fn find_field_span(source: &str, section: &str, name: &str, field: &str) -> SourceSpan {
    let table_header = format!("[{}.{}]", section, name);
    let search_start = source.find(&table_header).unwrap_or(0);
    let after_header = &source[search_start..];

    let field_prefix = format!("{} =", field);
    let field_prefix2 = format!("{}=", field);

    for prefix in [&field_prefix, &field_prefix2] {
        if let Some(rel_pos) = after_header.find(prefix) {
            let abs_pos = search_start + rel_pos;
            let eq_pos = source[abs_pos..].find('=').map(|p| abs_pos + p + 1);
            if let Some(val_start) = eq_pos {
                let val_trimmed = source[val_start..].trim_start();
                let trim_offset = val_start + (source[val_start..].len() - val_trimmed.len());
                let val_end = val_trimmed
                    .find('\n')
                    .unwrap_or(val_trimmed.len())
                    .min(val_trimmed.len());
                return (trim_offset, val_end).into();
            }
        }
    }

    find_table_span(source, section, name)
}

fn find_section_field_span(source: &str, section: &str, field: &str) -> SourceSpan {
    let header = format!("[{}]", section);
    let Some(start) = source.find(&header) else {
        return (0, 0).into();
    };
    let after = &source[start..];
    match after.find(&format!("{} =", field)) {
        Some(rel) => (start + rel, field.len()).into(),
        None => (start + 1, section.len()).into(),
    }
}

// ---------------------------------------------------------------------------
// Similarity suggestions
// ---------------------------------------------------------------------------

fn find_closest_match<'a>(name: &str, candidates: &'a [String]) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for candidate in candidates {
        let score = strsim::jaro_winkler(name, candidate);
        if score >= 0.8 && best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate.as_str(), score));
        }
    }
    best.map(|(name, _)| name)
}

// ---------------------------------------------------------------------------
// Main validation function
// ---------------------------------------------------------------------------

pub fn validate(
    config: &DevhostConfig,
    source: &str,
    filename: &str,
) -> Result<(), Vec<ConfigDiagnostic>> {
    let mut errors = Vec::new();
    let src = NamedSource::new(filename, source.to_string());

    for (name, svc) in &config.services {
        if svc.image.as_deref().is_some_and(|i| i.trim().is_empty()) {
            errors.push(ConfigDiagnostic::EmptyImage {
                src: src.clone(),
                span: find_field_span(source, "services", name, "image"),
                service: name.clone(),
            });
        }

        if let Some(handle) = &svc.handle {
            if !handle.starts_with('/') {
                errors.push(ConfigDiagnostic::InvalidHandle {
                    src: src.clone(),
                    span: find_field_span(source, "services", name, "handle"),
                    service: name.clone(),
                    handle: handle.clone(),
                });
            }
        }

        if svc.proxy {
            let missing = if svc.handle.as_deref().is_none_or(str::is_empty) {
                Some("handle")
            } else if svc.port.is_none() {
                Some("port")
            } else {
                None
            };
            if let Some(missing) = missing {
                errors.push(ConfigDiagnostic::IncompleteProxy {
                    src: src.clone(),
                    span: find_field_span(source, "services", name, "proxy"),
                    service: name.clone(),
                    missing,
                });
            }
        }

        if let Some(endpoint) = svc.health_endpoint.as_deref().filter(|e| !e.is_empty()) {
            let absolute = endpoint.starts_with("http://") || endpoint.starts_with("https://");
            if !absolute && svc.port.is_none() && svc.pinned_port.is_none() {
                errors.push(ConfigDiagnostic::HealthWithoutPort {
                    src: src.clone(),
                    span: find_field_span(source, "services", name, "health_endpoint"),
                    service: name.clone(),
                });
            }
        }
    }

    // Only container-managed services publish their port
    let mut port_map: BTreeMap<u16, Vec<String>> = BTreeMap::new();
    for (name, svc) in &config.services {
        if let (Some(_), Some(port)) = (&svc.image, svc.port) {
            port_map.entry(port).or_default().push(name.clone());
        }
    }
    for (port, services) in port_map {
        if services.len() > 1 {
            errors.push(ConfigDiagnostic::DuplicatePort {
                src: src.clone(),
                span: find_field_span(source, "services", &services[0], "port"),
                port,
                services,
            });
        }
    }

    let mut handle_map: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (name, svc) in &config.services {
        if let (true, Some(handle)) = (svc.proxy, &svc.handle) {
            handle_map
                .entry(handle.trim_end_matches('/'))
                .or_default()
                .push(name.clone());
        }
    }
    for (handle, services) in handle_map {
        if services.len() > 1 {
            errors.push(ConfigDiagnostic::DuplicateHandle {
                src: src.clone(),
                span: find_field_span(source, "services", &services[0], "handle"),
                handle: handle.to_string(),
                services,
            });
        }
    }

    if config.hasura.endpoint.is_none() && !config.services.contains_key(&config.hasura.service)
    {
        let available: Vec<String> = config.services.keys().cloned().collect();
        let advice = match find_closest_match(&config.hasura.service, &available) {
            Some(s) => format!("did you mean `{}`?", s),
            None => "declare the service or set `hasura.endpoint`".to_string(),
        };
        errors.push(ConfigDiagnostic::UnknownHasuraService {
            src: src.clone(),
            span: find_section_field_span(source, "hasura", "service"),
            advice,
            service: config.hasura.service.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
