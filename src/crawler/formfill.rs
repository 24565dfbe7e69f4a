//! Form fill planner
//!
//! Extracts a form schema from captured elements, obtains name/value
//! suggestions, applies them to the live elements, and clicks the submit
//! button. Per-field failures are logged and skipped so a single stubborn
//! widget cannot abort the fill.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::browser::{Page, PageElement};
use crate::types::{HTMLElement, HTMLForm};

use super::{CrawlError, Crawler};

/// Option value synthesized for `<select>` elements with no options
pub(crate) const PLACEHOLDER_OPTION: &str = "unknown";

/// Captured `<input>` field
#[derive(Debug, Clone, Serialize)]
pub struct FormInput {
    pub name: String,
    pub input_type: String,
    pub value: String,
    pub attributes: BTreeMap<String, String>,
}

/// Captured `<textarea>` field
#[derive(Debug, Clone, Serialize)]
pub struct FormTextArea {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

/// One `<option>` of a captured `<select>`
#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

/// Captured `<select>` field
#[derive(Debug, Clone, Serialize)]
pub struct FormSelect {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub options: Vec<SelectOption>,
}

/// A form field captured for suggestion lookup
#[derive(Debug, Clone, Serialize)]
pub enum FormField {
    Input(FormInput),
    TextArea(FormTextArea),
    Select(FormSelect),
}

impl FormField {
    pub fn name(&self) -> &str {
        match self {
            FormField::Input(input) => &input.name,
            FormField::TextArea(textarea) => &textarea.name,
            FormField::Select(select) => &select.name,
        }
    }
}

/// Source of name/value fill suggestions
pub trait FillSuggester: Send + Sync {
    /// Ordered name/value pairs for the captured fields. Names that resolve
    /// to no captured element are ignored by the planner.
    fn suggest(&self, fields: &[FormField]) -> Vec<(String, String)>;
}

/// Deterministic suggester keyed on input types and field-name substrings
pub struct DefaultFillSuggester;

impl FillSuggester for DefaultFillSuggester {
    fn suggest(&self, fields: &[FormField]) -> Vec<(String, String)> {
        fields
            .iter()
            .filter_map(|field| {
                let name = field.name();
                if name.is_empty() {
                    return None;
                }
                let value = match field {
                    FormField::Select(select) => select
                        .options
                        .iter()
                        .find(|o| !o.value.is_empty())
                        .map(|o| o.value.clone())?,
                    FormField::TextArea(_) => "Sample text".to_string(),
                    FormField::Input(input) => suggest_input_value(name, &input.input_type)?,
                };
                Some((name.to_string(), value))
            })
            .collect()
    }
}

fn suggest_input_value(name: &str, input_type: &str) -> Option<String> {
    let lower = name.to_lowercase();
    let value = match input_type {
        "checkbox" | "radio" => "on",
        "email" => "test@example.com",
        "tel" => "5551234567",
        "number" => "1",
        "url" => "https://example.com",
        "password" => "Password123!",
        "hidden" => return None,
        _ if lower.contains("mail") => "test@example.com",
        _ if lower.contains("phone") => "5551234567",
        _ if lower.contains("user") || lower.contains("login") => "testuser",
        _ if lower.contains("name") => "Test User",
        _ if lower.contains("zip") || lower.contains("postal") => "10001",
        _ => "Test",
    };
    Some(value.to_string())
}

fn derive_name(element: &HTMLElement) -> String {
    match element.attributes.get("name") {
        Some(name) if !name.is_empty() => name.clone(),
        _ => element.id.clone(),
    }
}

fn copy_attrs(src: &BTreeMap<String, String>, skip: &[&str]) -> BTreeMap<String, String> {
    src.iter()
        .filter(|(key, _)| !skip.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn to_form_input(element: &HTMLElement) -> FormInput {
    FormInput {
        name: derive_name(element),
        input_type: element.input_type.clone(),
        value: element.value.clone(),
        attributes: copy_attrs(&element.attributes, &["name", "value", "type"]),
    }
}

fn to_form_textarea(element: &HTMLElement) -> FormTextArea {
    FormTextArea {
        name: derive_name(element),
        attributes: copy_attrs(&element.attributes, &["name"]),
    }
}

impl Crawler {
    /// Fill and submit `form` on the live page. Fields are resolved by
    /// XPath in DOM order; the first `submit` input wins the submit-button
    /// slot, with submit `<button>`s as fallback.
    pub(crate) async fn process_form(
        &self,
        page: &dyn Page,
        form: &HTMLForm,
        cancel: &CancellationToken,
    ) -> Result<(), CrawlError> {
        if !self.config.automatic_form_fill {
            return Ok(());
        }

        let mut fields: Vec<FormField> = Vec::new();
        let mut submit: Option<Box<dyn PageElement>> = None;
        let mut live: HashMap<String, Box<dyn PageElement>> = HashMap::new();

        for field in &form.elements {
            if field.xpath.is_empty() {
                continue;
            }

            let element = match self.bounded(cancel, page.element_by_xpath(&field.xpath)).await {
                Ok(element) => element,
                Err(err) => {
                    debug!(xpath = %field.xpath, error = %err, "could not find form element");
                    continue;
                }
            };

            let name = derive_name(field);

            match field.tag_name.to_ascii_uppercase().as_str() {
                "INPUT" => {
                    if field.input_type == "submit" || field.input_type == "button" {
                        if submit.is_none() && field.input_type == "submit" {
                            submit = Some(element);
                        }
                        continue;
                    }
                    fields.push(FormField::Input(to_form_input(field)));
                    if !name.is_empty() {
                        live.insert(name, element);
                    }
                }
                "TEXTAREA" => {
                    fields.push(FormField::TextArea(to_form_textarea(field)));
                    if !name.is_empty() {
                        live.insert(name, element);
                    }
                }
                "SELECT" => {
                    let select = self.build_form_select(field, element.as_ref(), cancel).await;
                    fields.push(FormField::Select(select));
                    if !name.is_empty() {
                        live.insert(name, element);
                    }
                }
                "BUTTON" => {
                    if field.input_type == "submit" && submit.is_none() {
                        submit = Some(element);
                    }
                }
                _ => {}
            }
        }

        let suggestions = self.suggester.suggest(&fields);
        self.apply_form_suggestions(&suggestions, &live, cancel).await;

        if let Some(button) = submit {
            self.bounded(cancel, button.click()).await?;
        }
        Ok(())
    }

    async fn build_form_select(
        &self,
        field: &HTMLElement,
        element: &dyn PageElement,
        cancel: &CancellationToken,
    ) -> FormSelect {
        let mut options = Vec::new();

        match self.bounded(cancel, element.elements("option")).await {
            Ok(children) if !children.is_empty() => {
                for option in &children {
                    let value = match self.bounded(cancel, option.attribute("value")).await {
                        Ok(Some(value)) => value,
                        _ => self
                            .bounded(cancel, option.text())
                            .await
                            .unwrap_or_default(),
                    };
                    let selected = matches!(
                        self.bounded(cancel, option.attribute("selected")).await,
                        Ok(Some(_))
                    );
                    options.push(SelectOption { value, selected });
                }
            }
            _ => options.push(SelectOption {
                value: PLACEHOLDER_OPTION.to_string(),
                selected: true,
            }),
        }

        FormSelect {
            name: derive_name(field),
            attributes: copy_attrs(&field.attributes, &["name"]),
            options,
        }
    }

    async fn apply_form_suggestions(
        &self,
        suggestions: &[(String, String)],
        live: &HashMap<String, Box<dyn PageElement>>,
        cancel: &CancellationToken,
    ) {
        for (field_name, value) in suggestions {
            let element = match live.get(field_name) {
                Some(element) => element,
                None => continue,
            };
            if value.is_empty() {
                continue;
            }

            let tag = match self.bounded(cancel, element.tag_name()).await {
                Ok(tag) => tag.to_ascii_uppercase(),
                Err(err) => {
                    debug!(field = %field_name, error = %err, "failed to get element tag");
                    continue;
                }
            };

            match tag.as_str() {
                "INPUT" => {
                    let input_type = self
                        .bounded(cancel, element.attribute("type"))
                        .await
                        .ok()
                        .flatten()
                        .unwrap_or_default();
                    match input_type.as_str() {
                        "checkbox" | "radio" => {
                            if value == "on" || value == field_name {
                                if let Err(err) = self.bounded(cancel, element.click()).await {
                                    debug!(
                                        field = %field_name,
                                        kind = %input_type,
                                        error = %err,
                                        "failed to check input"
                                    );
                                }
                            }
                        }
                        _ => {
                            if let Err(err) = self.bounded(cancel, element.type_text(value)).await {
                                debug!(
                                    field = %field_name,
                                    value = %value,
                                    error = %err,
                                    "failed to fill input field"
                                );
                            }
                        }
                    }
                }
                "TEXTAREA" => {
                    if let Err(err) = self.bounded(cancel, element.type_text(value)).await {
                        debug!(
                            field = %field_name,
                            value = %value,
                            error = %err,
                            "failed to fill textarea"
                        );
                    }
                }
                "SELECT" => {
                    if self
                        .bounded(cancel, element.select_by_text(value))
                        .await
                        .is_err()
                    {
                        let selector = format!("[value=\"{}\"]", value);
                        if let Err(err) =
                            self.bounded(cancel, element.select_by_css(&selector)).await
                        {
                            debug!(
                                field = %field_name,
                                value = %value,
                                error = %err,
                                "failed to select option"
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserError, BrowserPool, Page, PageElement};
    use crate::crawler::{Crawler, CrawlerConfig};
    use crate::types::Action;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type EventLog = Arc<Mutex<Vec<String>>>;

    struct NullPool;

    #[async_trait]
    impl BrowserPool for NullPool {
        async fn get_page(&self) -> Result<Arc<dyn Page>, BrowserError> {
            Err(BrowserError::Site("no pages".to_string()))
        }

        async fn put_page(&self, _page: Arc<dyn Page>) {}
    }

    #[derive(Clone)]
    struct MockElement {
        label: String,
        tag: &'static str,
        attrs: BTreeMap<String, String>,
        text: String,
        options: Vec<MockElement>,
        fail_select_by_text: bool,
        log: EventLog,
    }

    impl MockElement {
        fn new(label: &str, tag: &'static str, log: EventLog) -> Self {
            Self {
                label: label.to_string(),
                tag,
                attrs: BTreeMap::new(),
                text: String::new(),
                options: Vec::new(),
                fail_select_by_text: false,
                log,
            }
        }

        fn attr(mut self, key: &str, value: &str) -> Self {
            self.attrs.insert(key.to_string(), value.to_string());
            self
        }

        fn record(&self, event: String) {
            self.log.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl PageElement for MockElement {
        async fn scroll_into_view(&self) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn visible(&self) -> Result<bool, BrowserError> {
            Ok(true)
        }

        async fn interactable(&self) -> Result<bool, BrowserError> {
            Ok(true)
        }

        async fn click(&self) -> Result<(), BrowserError> {
            self.record(format!("click {}", self.label));
            Ok(())
        }

        async fn type_text(&self, text: &str) -> Result<(), BrowserError> {
            self.record(format!("type {}={}", self.label, text));
            Ok(())
        }

        async fn select_by_text(&self, value: &str) -> Result<(), BrowserError> {
            if self.fail_select_by_text {
                return Err(BrowserError::Site("no option with text".to_string()));
            }
            self.record(format!("select-text {}={}", self.label, value));
            Ok(())
        }

        async fn select_by_css(&self, selector: &str) -> Result<(), BrowserError> {
            self.record(format!("select-css {}={}", self.label, selector));
            Ok(())
        }

        async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
            Ok(self.attrs.get(name).cloned())
        }

        async fn text(&self) -> Result<String, BrowserError> {
            Ok(self.text.clone())
        }

        async fn tag_name(&self) -> Result<String, BrowserError> {
            Ok(self.tag.to_string())
        }

        async fn elements(&self, _selector: &str) -> Result<Vec<Box<dyn PageElement>>, BrowserError> {
            Ok(self
                .options
                .iter()
                .map(|o| Box::new(o.clone()) as Box<dyn PageElement>)
                .collect())
        }
    }

    struct MockFormPage {
        elements: HashMap<String, MockElement>,
    }

    #[async_trait]
    impl Page for MockFormPage {
        async fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn current_url(&self) -> Result<String, BrowserError> {
            Ok("https://example.com/form".to_string())
        }

        async fn content(&self) -> Result<String, BrowserError> {
            Ok("<html></html>".to_string())
        }

        async fn wait_load_heuristics(&self) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn element_by_xpath(
            &self,
            xpath: &str,
        ) -> Result<Box<dyn PageElement>, BrowserError> {
            self.elements
                .get(xpath)
                .map(|e| Box::new(e.clone()) as Box<dyn PageElement>)
                .ok_or_else(|| BrowserError::Site(format!("no element at {}", xpath)))
        }

        async fn find_navigations(&self) -> Result<Vec<Action>, BrowserError> {
            Ok(Vec::new())
        }

        async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
            Ok(Vec::new())
        }
    }

    fn field(tag: &str, xpath: &str, name: &str, input_type: &str) -> HTMLElement {
        let mut element = HTMLElement {
            tag_name: tag.to_string(),
            xpath: xpath.to_string(),
            input_type: input_type.to_string(),
            ..HTMLElement::default()
        };
        if !name.is_empty() {
            element
                .attributes
                .insert("name".to_string(), name.to_string());
        }
        element
    }

    fn crawler(automatic_form_fill: bool) -> Crawler {
        let config = CrawlerConfig {
            automatic_form_fill,
            ..CrawlerConfig::default()
        };
        Crawler::new(config, Arc::new(NullPool)).unwrap()
    }

    fn login_form() -> HTMLForm {
        HTMLForm {
            elements: vec![
                field("INPUT", "//input[1]", "username", "text"),
                field("INPUT", "//input[2]", "", "submit"),
                field("INPUT", "//input[3]", "agree", "checkbox"),
                field("TEXTAREA", "//textarea[1]", "bio", ""),
                field("SELECT", "//select[1]", "color", ""),
                // no xpath, skipped entirely
                field("INPUT", "", "ghost", "text"),
                field("BUTTON", "//button[1]", "", "submit"),
            ],
        }
    }

    fn login_page(log: &EventLog) -> MockFormPage {
        let mut select = MockElement::new("color", "SELECT", log.clone());
        select.options = vec![
            MockElement::new("opt-red", "OPTION", log.clone()).attr("value", "red"),
            MockElement::new("opt-blue", "OPTION", log.clone()).attr("value", "blue"),
        ];

        let elements = HashMap::from([
            (
                "//input[1]".to_string(),
                MockElement::new("username", "INPUT", log.clone()).attr("type", "text"),
            ),
            (
                "//input[2]".to_string(),
                MockElement::new("submit-input", "INPUT", log.clone()).attr("type", "submit"),
            ),
            (
                "//input[3]".to_string(),
                MockElement::new("agree", "INPUT", log.clone()).attr("type", "checkbox"),
            ),
            (
                "//textarea[1]".to_string(),
                MockElement::new("bio", "TEXTAREA", log.clone()),
            ),
            ("//select[1]".to_string(), select),
            (
                "//button[1]".to_string(),
                MockElement::new("submit-button", "BUTTON", log.clone()).attr("type", "submit"),
            ),
        ]);
        MockFormPage { elements }
    }

    #[tokio::test]
    async fn test_form_filled_and_submitted() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let page = login_page(&log);
        let crawler = crawler(true);
        let cancel = CancellationToken::new();

        crawler
            .process_form(&page, &login_form(), &cancel)
            .await
            .unwrap();

        let events = log.lock().unwrap().clone();
        assert!(events.contains(&"type username=testuser".to_string()));
        assert!(events.contains(&"type bio=Sample text".to_string()));
        assert!(events.contains(&"click agree".to_string()));
        assert!(events.contains(&"select-text color=red".to_string()));
        // first submit input wins over the submit button, and goes last
        assert_eq!(events.last().map(String::as_str), Some("click submit-input"));
        assert!(!events.iter().any(|e| e.contains("submit-button")));
    }

    #[tokio::test]
    async fn test_select_falls_back_to_css_value() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut page = login_page(&log);
        if let Some(select) = page.elements.get_mut("//select[1]") {
            select.fail_select_by_text = true;
        }
        let crawler = crawler(true);
        let cancel = CancellationToken::new();

        crawler
            .process_form(&page, &login_form(), &cancel)
            .await
            .unwrap();

        let events = log.lock().unwrap().clone();
        assert!(events.contains(&"select-css color=[value=\"red\"]".to_string()));
    }

    #[tokio::test]
    async fn test_disabled_form_fill_is_noop() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let page = login_page(&log);
        let crawler = crawler(false);
        let cancel = CancellationToken::new();

        crawler
            .process_form(&page, &login_form(), &cancel)
            .await
            .unwrap();

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_derive_name_prefers_name_attribute() {
        let mut element = HTMLElement {
            id: "fallback".to_string(),
            ..HTMLElement::default()
        };
        assert_eq!(derive_name(&element), "fallback");
        element
            .attributes
            .insert("name".to_string(), "primary".to_string());
        assert_eq!(derive_name(&element), "primary");
    }

    #[test]
    fn test_placeholder_option_for_empty_select() {
        let suggester = DefaultFillSuggester;
        let fields = vec![FormField::Select(FormSelect {
            name: "empty".to_string(),
            attributes: BTreeMap::new(),
            options: vec![SelectOption {
                value: PLACEHOLDER_OPTION.to_string(),
                selected: true,
            }],
        })];
        let suggestions = suggester.suggest(&fields);
        assert_eq!(
            suggestions,
            vec![("empty".to_string(), PLACEHOLDER_OPTION.to_string())]
        );
    }
}
