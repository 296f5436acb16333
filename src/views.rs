//! HTML 视图渲染：登录、注册与目录列表页。

use axum::response::Html;
use chrono::DateTime;
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ApiError;

const LOGIN_TEMPLATE: &str = "login.html";
const REGISTER_TEMPLATE: &str = "register.html";
const VIEW_TEMPLATE: &str = "view.html";

/// 下游 `list` 接口返回的文件记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub size: i64,
    pub mod_time: i64,
}

#[derive(Debug, Serialize)]
struct FileRow {
    name: String,
    size: i64,
    modified: String,
}

impl From<&FileRecord> for FileRow {
    fn from(record: &FileRecord) -> Self {
        let modified = DateTime::from_timestamp(record.mod_time, 0)
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        FileRow {
            name: record.name.clone(),
            size: record.size,
            modified,
        }
    }
}

/// 表单数据及按字段归类的错误信息。
#[derive(Debug, Default, Serialize)]
pub struct FormView {
    pub storage_name: String,
    pub errors: BTreeMap<&'static str, String>,
}

impl FormView {
    pub fn new(storage_name: impl Into<String>) -> Self {
        FormView {
            storage_name: storage_name.into(),
            errors: BTreeMap::new(),
        }
    }

    pub fn add_error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct DirectoryView<'a> {
    pub title: &'a str,
    pub storage_name: &'a str,
    pub permanent: bool,
    pub view_permanent_link: bool,
    pub files: &'a [FileRecord],
}

pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(LOGIN_TEMPLATE, include_str!("../templates/login.html"))?;
        env.add_template(REGISTER_TEMPLATE, include_str!("../templates/register.html"))?;
        env.add_template(VIEW_TEMPLATE, include_str!("../templates/view.html"))?;
        Ok(Views { env })
    }

    pub fn login(&self, form: &FormView) -> Result<Html<String>, ApiError> {
        self.render(LOGIN_TEMPLATE, form)
    }

    pub fn register(&self, form: &FormView) -> Result<Html<String>, ApiError> {
        self.render(REGISTER_TEMPLATE, form)
    }

    pub fn directory(&self, view: &DirectoryView<'_>) -> Result<Html<String>, ApiError> {
        let rows: Vec<FileRow> = view.files.iter().map(FileRow::from).collect();
        let ctx = minijinja::context! {
            title => view.title,
            storage_name => view.storage_name,
            permanent => view.permanent,
            view_permanent_link => view.view_permanent_link,
            files => rows,
        };
        self.render(VIEW_TEMPLATE, ctx)
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, ApiError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|err| ApiError::internal("view error", err))?;
        template
            .render(ctx)
            .map(Html)
            .map_err(|err| ApiError::internal("view error", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_lists_files_and_permanent_link() {
        let views = Views::new().expect("views");
        let files = vec![FileRecord {
            name: "report.txt".into(),
            size: 42,
            mod_time: 0,
        }];
        let Html(html) = views
            .directory(&DirectoryView {
                title: "Duplo",
                storage_name: "acme",
                permanent: false,
                view_permanent_link: true,
                files: &files,
            })
            .expect("render");
        assert!(html.contains("report.txt"));
        assert!(html.contains("1970-01-01 00:00:00"));
        assert!(html.contains("/acme/permanent/"));
    }

    #[test]
    fn permanent_view_hides_permanent_link() {
        let views = Views::new().expect("views");
        let Html(html) = views
            .directory(&DirectoryView {
                title: "Duplo",
                storage_name: "acme",
                permanent: true,
                view_permanent_link: false,
                files: &[],
            })
            .expect("render");
        assert!(!html.contains("href=\"/acme/permanent/\""));
    }

    #[test]
    fn login_form_shows_field_errors() {
        let views = Views::new().expect("views");
        let mut form = FormView::new("acme");
        form.add_error("password", "Please enter password to login");
        let Html(html) = views.login(&form).expect("render");
        assert!(html.contains("Please enter password to login"));
    }

    #[test]
    fn file_names_are_escaped() {
        let views = Views::new().expect("views");
        let files = vec![FileRecord {
            name: "<script>.txt".into(),
            size: 1,
            mod_time: 1,
        }];
        let Html(html) = views
            .directory(&DirectoryView {
                title: "Duplo",
                storage_name: "acme",
                permanent: false,
                view_permanent_link: false,
                files: &files,
            })
            .expect("render");
        assert!(!html.contains("<script>.txt"));
    }
}
