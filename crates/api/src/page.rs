//! HTML Form Page
//!
//! Server-rendered single page: the reading form, laid out from the
//! `FormSchema`, followed by the verdict panel or the list of rejected
//! fields after a submission.

use alerting::{Tone, Verdict};
use feature_engine::{FieldSpec, FormSchema, Widget};
use std::collections::HashMap;

/// Result block shown under the form
#[derive(Debug, Clone)]
pub enum Outcome {
    Verdict(Verdict),
    Errors(Vec<String>),
}

/// Current input values keyed by field name, as text
#[derive(Debug, Clone, Default)]
pub struct FormValues(HashMap<&'static str, String>);

impl FormValues {
    /// Values the form is pre-filled with
    pub fn defaults(schema: &FormSchema) -> Self {
        let values = schema
            .fields
            .iter()
            .map(|field| {
                let value = match &field.widget {
                    Widget::Number { default, .. } | Widget::Slider { default, .. } => {
                        format_number(*default)
                    }
                    Widget::Select { default, .. } => default.to_string(),
                };
                (field.name, value)
            })
            .collect();
        Self(values)
    }

    /// Defaults overlaid with what the user submitted, so a rejected form
    /// comes back as it was entered
    pub fn from_submission(schema: &FormSchema, submitted: &HashMap<String, String>) -> Self {
        let mut values = Self::defaults(schema);
        for field in &schema.fields {
            if let Some(value) = submitted.get(field.name) {
                values.0.insert(field.name, value.trim().to_string());
            }
        }
        values
    }

    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("")
    }
}

fn format_number(value: f64) -> String {
    format!("{}", value)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn icon(tone: Tone) -> &'static str {
    match tone {
        Tone::Success => "✅",
        Tone::Warning => "⚠️",
        Tone::Error => "🚨",
    }
}

fn bound(name: &str, value: Option<f64>) -> String {
    value
        .map(|v| format!(" {}=\"{}\"", name, format_number(v)))
        .unwrap_or_default()
}

fn render_field(field: &FieldSpec, value: &str) -> String {
    let name = field.name;
    let value = escape(value);
    let input = match &field.widget {
        Widget::Number { min, max, step, .. } => format!(
            "<input type=\"number\" id=\"{name}\" name=\"{name}\" step=\"{step}\"{}{} value=\"{value}\"{required}>",
            bound("min", *min),
            bound("max", *max),
            step = format_number(*step),
            required = if field.required { " required" } else { "" },
        ),
        Widget::Slider { min, max, step, .. } => format!(
            "<input type=\"range\" id=\"{name}\" name=\"{name}\" min=\"{}\" max=\"{}\" step=\"{}\" value=\"{value}\" \
             oninput=\"this.nextElementSibling.value=this.value\"><output>{value}</output>",
            format_number(*min),
            format_number(*max),
            format_number(*step),
        ),
        Widget::Select { options, .. } => {
            let options: String = options
                .iter()
                .map(|option| {
                    let selected = if *option == value { " selected" } else { "" };
                    format!("<option value=\"{option}\"{selected}>{option}</option>")
                })
                .collect();
            format!("<select id=\"{name}\" name=\"{name}\">{options}</select>")
        }
    };

    format!(
        "<div class=\"field\"><label for=\"{name}\">{}</label>{input}</div>",
        escape(field.label)
    )
}

fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Verdict(verdict) => format!(
            "<div class=\"verdict {tone}\" style=\"border-color:{color};color:{color}\">\
             <strong>{icon} {headline}</strong> (Risk Factor: {risk:.1}%)</div>",
            tone = verdict.tone.as_str(),
            color = verdict.tone.color(),
            icon = icon(verdict.tone),
            headline = escape(verdict.headline),
            risk = verdict.risk_percent,
        ),
        Outcome::Errors(errors) => {
            let items: String = errors
                .iter()
                .map(|e| format!("<li>{}</li>", escape(e)))
                .collect();
            format!(
                "<div class=\"verdict error\" style=\"border-color:{color};color:{color}\">\
                 <strong>{icon} Invalid input</strong><ul>{items}</ul></div>",
                color = Tone::Error.color(),
                icon = icon(Tone::Error),
            )
        }
    }
}

const STYLE: &str = "body{font-family:sans-serif;max-width:860px;margin:2rem auto;padding:0 1rem}\
.columns{display:grid;grid-template-columns:1fr 1fr;gap:0 2rem}\
.field{display:flex;flex-direction:column;margin-bottom:1rem}\
.field label{font-weight:600;margin-bottom:.3rem}\
button{padding:.6rem 1.2rem;font-size:1rem;cursor:pointer}\
.verdict{margin-top:1.5rem;padding:1rem;border:2px solid;border-radius:6px}";

/// Render the whole page
pub fn render(
    title: &str,
    schema: &FormSchema,
    values: &FormValues,
    outcome: Option<&Outcome>,
) -> String {
    let column = |n: u8| -> String {
        schema
            .fields
            .iter()
            .filter(|f| f.column == n)
            .map(|f| render_field(f, values.get(f.name)))
            .collect()
    };

    let title = escape(title);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>Maintenance System</title><style>{STYLE}</style></head><body>\
         <h1>⚙️ {title}</h1><h2>Vehicle Data</h2>\
         <form method=\"post\" action=\"/\">\
         <div class=\"columns\"><div>{left}</div><div>{right}</div></div>\
         {full}<button type=\"submit\">Predict Maintenance Risk</button></form>\
         {outcome}</body></html>\n",
        left = column(1),
        right = column(2),
        full = column(0),
        outcome = outcome.map(render_outcome).unwrap_or_default(),
    )
}
