//! Landing page views for `/`.

use askama::Template;
use serde_json::Value;

use crate::session::Identity;

#[derive(Template)]
#[template(path = "anonymous.html")]
pub struct AnonymousView;

#[derive(Template)]
#[template(path = "welcome.html")]
pub struct WelcomeView {
    pub user_email: String,
    /// Compact JSON; `null` when the CAS server sent no attributes.
    pub user_attributes: String,
}

impl WelcomeView {
    pub fn new(user_email: &str, user_attributes: &Value) -> Self {
        Self {
            user_email: user_email.to_string(),
            user_attributes: serde_json::to_string(user_attributes).unwrap_or_else(|_| "null".to_string()),
        }
    }
}

impl From<&Identity> for WelcomeView {
    fn from(identity: &Identity) -> Self {
        Self::new(&identity.user_email, &identity.user_attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn anonymous_page_links_to_login() {
        let p = AnonymousView.render().unwrap();
        assert!(p.contains("Hello, anonymous user!"));
        assert!(p.contains("href=\"/login\""));
    }

    #[test]
    fn welcome_page_embeds_email_and_attributes() {
        let p = WelcomeView::new("a@b.com", &json!({"role": "admin"})).render().unwrap();
        assert!(p.contains("Welcome, a@b.com!"));
        assert!(p.contains("role"));
        assert!(p.contains("admin"));
        assert!(p.contains("href=\"/logout\""));
    }

    #[test]
    fn welcome_page_shows_null_attributes() {
        let p = WelcomeView::new("a@b.com", &Value::Null).render().unwrap();
        assert!(p.contains("<code>null</code>"));
    }

    #[test]
    fn welcome_page_escapes_hostile_values() {
        let p = WelcomeView::new("<script>x</script>@evil", &json!({"k": "<img src=x>"})).render().unwrap();
        assert!(!p.contains("<script>"));
        assert!(!p.contains("<img"));
        assert!(!p.contains("{\"k\""));
        assert!(p.contains("&lt;script&gt;x"));
    }
}
