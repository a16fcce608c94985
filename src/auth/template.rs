use super::ClaimSet;

const DELIMITER: &str = "%%";

/// Maps a `%%name%%` token to the introspection claim that replaces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placeholder {
    pub token: &'static str,
    pub claim: &'static str,
}

/// Placeholders understood in username templates, applied in declaration order.
pub static PLACEHOLDERS: &[Placeholder] = &[
    Placeholder {
        token: "%%oidc-username%%",
        claim: "username",
    },
    Placeholder {
        token: "%%oidc-email%%",
        claim: "email",
    },
    Placeholder {
        token: "%%oidc-sub%%",
        claim: "sub",
    },
    Placeholder {
        token: "%%oidc-client-id%%",
        claim: "client_id",
    },
    Placeholder {
        token: "%%oidc-scope%%",
        claim: "scope",
    },
    Placeholder {
        token: "%%rolescope%%",
        claim: "rolescope",
    },
];

/// Renders username templates against the claims of an introspection response.
#[derive(Clone, Copy, Debug)]
pub struct TemplateEngine {
    placeholders: &'static [Placeholder],
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(PLACEHOLDERS)
    }
}

impl TemplateEngine {
    pub fn new(placeholders: &'static [Placeholder]) -> Self {
        Self { placeholders }
    }

    /// True when the template contains a `%%…%%` pair, i.e. it may need claims to render.
    pub fn has_placeholders(template: &str) -> bool {
        let Some(start) = template.find(DELIMITER) else {
            return false;
        };
        template[start + DELIMITER.len()..].contains(DELIMITER)
    }

    /// Replaces every known placeholder with the string value of its claim.
    ///
    /// Placeholders are applied one after another in declaration order, each one
    /// replacing all of its occurrences. A claim that is missing or not a string renders
    /// as an empty string. Claim values are copied to the output as-is and are never
    /// searched by later placeholders.
    pub fn substitute(&self, template: &str, claims: &ClaimSet) -> String {
        if !Self::has_placeholders(template) {
            return template.to_string();
        }

        let mut segments = vec![Segment::Literal(template)];

        for placeholder in self.placeholders {
            if !segments.iter().any(|segment| segment.contains(placeholder.token)) {
                continue;
            }

            let value = claims.get_str(placeholder.claim).unwrap_or_default();
            let mut next = Vec::with_capacity(segments.len() + 2);

            for segment in segments {
                let Segment::Literal(text) = segment else {
                    next.push(segment);
                    continue;
                };

                let mut parts = text.split(placeholder.token);
                if let Some(first) = parts.next() {
                    next.push(Segment::Literal(first));
                }
                for part in parts {
                    next.push(Segment::Rendered(value));
                    next.push(Segment::Literal(part));
                }
            }

            segments = next;
        }

        segments.iter().map(Segment::as_str).collect()
    }
}

/// Piece of a template being rendered: original text still open to substitution, or a
/// claim value that is final.
#[derive(Clone, Copy, Debug)]
enum Segment<'a> {
    Literal(&'a str),
    Rendered(&'a str),
}

impl<'a> Segment<'a> {
    fn contains(&self, token: &str) -> bool {
        match self {
            Segment::Literal(text) => text.contains(token),
            Segment::Rendered(_) => false,
        }
    }

    fn as_str(&self) -> &'a str {
        match self {
            Segment::Literal(text) | Segment::Rendered(text) => text,
        }
    }
}
