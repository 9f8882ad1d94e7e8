//! GraphQL query templates.
//!
//! Each collection has a first-page template `<name>.txt` and a follow-up
//! template `<name>_pagination.txt`. Built-in copies are compiled into the
//! binary; a directory configured through `SDSS_INSTALL_GRAPHQL_DIR` replaces
//! them wholesale.
//!
//! Templates use `%(key)s` placeholders. Rendering an unknown key is an error
//! rather than leaving the placeholder in the query.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Parameters substituted into a query template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameters {
    pub organization_name: String,
    pub repository_name: String,
    pub version: String,
    pub query_file_name: String,
    pub pagination_flag: bool,
    pub end_cursor: Option<String>,
    pub has_next_page: Option<bool>,
}

impl QueryParameters {
    /// First-page parameters for a collection query.
    pub fn new(
        organization_name: impl Into<String>,
        repository_name: impl Into<String>,
        version: impl Into<String>,
        query_file_name: impl Into<String>,
    ) -> Self {
        Self {
            organization_name: organization_name.into(),
            repository_name: repository_name.into(),
            version: version.into(),
            query_file_name: query_file_name.into(),
            pagination_flag: false,
            end_cursor: None,
            has_next_page: None,
        }
    }

    /// Move to the page after `end_cursor`.
    pub fn advance(&mut self, end_cursor: String) {
        self.pagination_flag = true;
        self.end_cursor = Some(end_cursor);
        self.has_next_page = Some(true);
    }

    /// Template file name for the current page.
    pub fn template_name(&self) -> String {
        if self.pagination_flag {
            format!("{}_pagination", self.query_file_name)
        } else {
            self.query_file_name.clone()
        }
    }

    fn value(&self, key: &str) -> Option<String> {
        let value = match key {
            "organization_name" => self.organization_name.clone(),
            "repository_name" => self.repository_name.clone(),
            "version" => self.version.clone(),
            "query_file_name" => self.query_file_name.clone(),
            "pagination_flag" => self.pagination_flag.to_string(),
            "end_cursor" => self.end_cursor.clone().unwrap_or_default(),
            "has_next_page" => self
                .has_next_page
                .map(|v| v.to_string())
                .unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }
}

/// Where query templates are loaded from.
#[derive(Debug, Clone, Default)]
pub struct QueryTemplates {
    dir: Option<PathBuf>,
}

impl QueryTemplates {
    /// Use built-in templates unless `dir` is given.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Load the template text for `name`.
    pub fn load(&self, name: &str) -> Result<String> {
        match &self.dir {
            Some(dir) => {
                let file = dir.join(format!("{}.txt", name));
                if !file.is_file() {
                    return Err(Error::Configuration {
                        message: format!(
                            "the file named {} does not exist in the directory {}",
                            file.file_name().unwrap_or_default().to_string_lossy(),
                            dir.display()
                        ),
                        hint: Some("check SDSS_INSTALL_GRAPHQL_DIR".to_string()),
                    });
                }
                Ok(fs::read_to_string(&file)?)
            }
            None => builtin(name)
                .map(str::to_string)
                .ok_or_else(|| Error::config(format!("no built-in GraphQL query named {}", name))),
        }
    }

    /// Load and render the template selected by `parameters`.
    pub fn query_for(&self, parameters: &QueryParameters) -> Result<String> {
        let template = self.load(&parameters.template_name())?;
        render(&template, parameters)
    }
}

fn builtin(name: &str) -> Option<&'static str> {
    let text = match name {
        "repositories" => include_str!("../graphql/repositories.txt"),
        "repositories_pagination" => include_str!("../graphql/repositories_pagination.txt"),
        "branches" => include_str!("../graphql/branches.txt"),
        "branches_pagination" => include_str!("../graphql/branches_pagination.txt"),
        "tags" => include_str!("../graphql/tags.txt"),
        "tags_pagination" => include_str!("../graphql/tags_pagination.txt"),
        _ => return None,
    };
    Some(text)
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"%\((\w+)\)s").expect("placeholder pattern is valid"))
}

/// Substitute every `%(key)s` in `template`.
pub fn render(template: &str, parameters: &QueryParameters) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for captures in placeholder().captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let key = &captures[1];
        let value = parameters.value(key).ok_or_else(|| Error::Configuration {
            message: format!("unknown GraphQL template parameter {}", key),
            hint: None,
        })?;
        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&value);
        last = whole.end();
    }
    rendered.push_str(&template[last..]);
    Ok(rendered)
}
