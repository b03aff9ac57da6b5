use crate::descriptor::{PropValue, Props, Style};
use crate::patch::Mutation;

/// Host mutations that turn a node rendered with `old` into one rendered with
/// `new`. Unchanged props produce nothing.
pub(crate) fn diff_props(old: &Props, new: &Props) -> Vec<Mutation> {
    let mut mutations = Vec::new();

    for (name, value) in old.iter() {
        if new.contains(name) {
            continue;
        }
        if let (Some(event), PropValue::Listener(handler)) = (event_name(name), value) {
            mutations.push(Mutation::RemoveListener {
                event,
                handler: handler.clone(),
            });
        } else if name == "style" {
            mutations.push(Mutation::SetCssText(String::new()));
        } else {
            mutations.push(Mutation::RemoveAttribute {
                name: name.to_owned(),
            });
        }
    }

    for (name, value) in new.iter() {
        let previous = old.get(name);
        if previous == Some(value) {
            continue;
        }
        let listener_event = event_name(name).filter(|_| {
            matches!(value, PropValue::Listener(_))
                || matches!(previous, Some(PropValue::Listener(_)))
        });
        if let Some(event) = listener_event {
            if let Some(PropValue::Listener(handler)) = previous {
                mutations.push(Mutation::RemoveListener {
                    event: event.clone(),
                    handler: handler.clone(),
                });
            }
            if let PropValue::Listener(handler) = value {
                mutations.push(Mutation::AddListener {
                    event,
                    handler: handler.clone(),
                });
            }
        } else if name == "style" {
            diff_style(previous, value, &mut mutations);
        } else {
            match value {
                PropValue::Bool(true) => mutations.push(Mutation::SetAttribute {
                    name: name.to_owned(),
                    value: String::new(),
                }),
                PropValue::Bool(false) | PropValue::Null => {
                    if previous.is_some() {
                        mutations.push(Mutation::RemoveAttribute {
                            name: name.to_owned(),
                        });
                    }
                }
                PropValue::Object(_) | PropValue::Listener(_) | PropValue::Style(_) => {}
                literal => {
                    if let Some(text) = literal.literal() {
                        mutations.push(Mutation::SetAttribute {
                            name: name.to_owned(),
                            value: text,
                        });
                    }
                }
            }
        }
    }

    mutations
}

fn diff_style(previous: Option<&PropValue>, value: &PropValue, mutations: &mut Vec<Mutation>) {
    match value {
        PropValue::Style(Style::Text(css)) => mutations.push(Mutation::SetCssText(css.clone())),
        PropValue::Str(css) => mutations.push(Mutation::SetCssText(css.to_string())),
        PropValue::Style(Style::Map(entries)) => {
            let old_entries = match previous {
                Some(PropValue::Style(Style::Map(old_entries))) => Some(old_entries),
                Some(_) => {
                    mutations.push(Mutation::SetCssText(String::new()));
                    None
                }
                None => None,
            };
            for name in old_entries.into_iter().flat_map(|old| old.keys()) {
                if !entries.contains_key(name) {
                    mutations.push(Mutation::RemoveStyle { name: name.clone() });
                }
            }
            for (name, style_value) in entries {
                if old_entries.and_then(|old| old.get(name)) == Some(style_value) {
                    continue;
                }
                mutations.push(Mutation::SetStyle {
                    name: name.clone(),
                    value: style_value.clone(),
                });
            }
        }
        _ => {
            if previous.is_some() {
                mutations.push(Mutation::SetCssText(String::new()));
            }
        }
    }
}

/// `onClick` -> `click`. Only props holding a listener are treated as events.
fn event_name(prop: &str) -> Option<String> {
    let rest = prop.strip_prefix("on")?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_ascii_lowercase())
}

#[cfg(test)]
#[path = "tests/diff_tests.rs"]
mod tests;
