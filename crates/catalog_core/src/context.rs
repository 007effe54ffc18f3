use crate::error::CatalogError;

/// Identity of the caller, resolved at the boundary and passed into every
/// operation. There is no ambient identity anywhere in the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub actor_id: String,
    pub is_privileged: bool,
    pub source_ip: Option<String>,
}

impl CallerContext {
    pub fn privileged(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            is_privileged: true,
            source_ip: None,
        }
    }

    pub fn public(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            is_privileged: false,
            source_ip: None,
        }
    }

    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    pub fn require_privileged(&self, action: &str) -> Result<(), CatalogError> {
        if self.is_privileged {
            Ok(())
        } else {
            Err(CatalogError::Forbidden(format!(
                "{} may not {action}",
                self.actor_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_caller_is_forbidden() {
        let ctx = CallerContext::public("anon").with_source_ip("10.0.0.9");
        let err = ctx.require_privileged("create component").unwrap_err();
        assert_eq!(err.to_string(), "forbidden: anon may not create component");
        assert_eq!(ctx.source_ip.as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn privileged_caller_passes() {
        assert!(CallerContext::privileged("admin")
            .require_privileged("delete color")
            .is_ok());
    }
}
