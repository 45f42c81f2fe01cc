use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::{AttributeValue, Error, Item, RequestId, Response, StoreClient};

#[derive(Debug, Clone, PartialEq)]
pub enum IssuedRequest {
    Get {
        id: RequestId,
        path: String,
        attributes: Vec<String>,
    },
    Update {
        id: RequestId,
        path: String,
        expression: String,
    },
}

impl IssuedRequest {
    pub fn id(&self) -> RequestId {
        match self {
            IssuedRequest::Get { id, .. } | IssuedRequest::Update { id, .. } => *id,
        }
    }
}

/// In-process store that executes requests as they are issued and queues
/// their responses until [`MemoryStore::drain_responses`] is called.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: RequestId,
    items: HashMap<String, Item>,
    responses: VecDeque<Response>,
    issued: Vec<IssuedRequest>,
    fail_issue: usize,
    fail_execution: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next request is refused at issue time
    pub fn fail_next_issue(&self) {
        self.state.lock().fail_issue += 1;
    }

    /// The next request is accepted but completes with an error response
    pub fn fail_next_execution(&self) {
        self.state.lock().fail_execution += 1;
    }

    pub fn drain_responses(&self) -> Vec<Response> {
        self.state.lock().responses.drain(..).collect()
    }

    pub fn pending_responses(&self) -> usize {
        self.state.lock().responses.len()
    }

    pub fn issued(&self) -> Vec<IssuedRequest> {
        self.state.lock().issued.clone()
    }

    pub fn item(&self, path: &str) -> Option<Item> {
        self.state.lock().items.get(path).cloned()
    }

    pub fn item_count(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn put_item(&self, path: impl Into<String>, item: Item) {
        self.state.lock().items.insert(path.into(), item);
    }
}

impl MemoryState {
    fn issue(&mut self) -> Result<RequestId, Error> {
        if self.fail_issue > 0 {
            self.fail_issue -= 1;
            return Err(Error::Transport("connection refused".to_string()));
        }
        self.next_id += 1;
        Ok(self.next_id)
    }

    fn injected_failure(&mut self) -> Option<Error> {
        if self.fail_execution > 0 {
            self.fail_execution -= 1;
            return Some(Error::Transport("request timed out".to_string()));
        }
        None
    }
}

impl StoreClient for MemoryStore {
    fn get_item(&self, path: &str, attributes: &[&str]) -> Result<RequestId, Error> {
        let mut state = self.state.lock();
        let id = state.issue()?;
        state.issued.push(IssuedRequest::Get {
            id,
            path: path.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        });

        let outcome = match state.injected_failure() {
            Some(err) => Err(err),
            None => match state.items.get(path) {
                Some(item) => Ok(Some(
                    item.iter()
                        .filter(|(name, _)| attributes.contains(&name.as_str()))
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect(),
                )),
                None => Err(Error::NotFound(path.to_string())),
            },
        };

        state.responses.push_back(Response { id, outcome });
        Ok(id)
    }

    fn update_item(&self, path: &str, expression: &str) -> Result<RequestId, Error> {
        let mut state = self.state.lock();
        let id = state.issue()?;
        state.issued.push(IssuedRequest::Update {
            id,
            path: path.to_string(),
            expression: expression.to_string(),
        });

        let outcome = match state.injected_failure() {
            Some(err) => Err(err),
            None => {
                let mut item = state.items.get(path).cloned().unwrap_or_default();
                match apply_expression(&mut item, expression) {
                    Ok(()) => {
                        state.items.insert(path.to_string(), item);
                        Ok(None)
                    }
                    Err(err) => Err(err),
                }
            }
        };

        state.responses.push_back(Response { id, outcome });
        Ok(id)
    }
}

/// Applies `name=value` and `name[index]=value` clauses separated by `;`.
/// String literals are single quoted with embedded quotes doubled.
fn apply_expression(item: &mut Item, expression: &str) -> Result<(), Error> {
    for clause in split_clauses(expression)? {
        let (lhs, rhs) = clause
            .split_once('=')
            .ok_or_else(|| Error::InvalidExpression(clause.to_string()))?;
        let (lhs, rhs) = (lhs.trim(), rhs.trim());

        match lhs.split_once('[') {
            Some((name, index)) => {
                let index: usize = index
                    .strip_suffix(']')
                    .and_then(|i| i.parse().ok())
                    .ok_or_else(|| Error::InvalidExpression(clause.to_string()))?;
                let value: i64 = rhs
                    .parse()
                    .map_err(|_| Error::InvalidExpression(clause.to_string()))?;

                match item.get_mut(name) {
                    Some(AttributeValue::IntArray(array)) if index < array.len() => {
                        array[index] = value;
                    }
                    _ => {
                        return Err(Error::InvalidExpression(format!(
                            "{}: no array slot {} in {}",
                            clause, index, name
                        )));
                    }
                }
            }
            None => {
                let value = parse_value(rhs)
                    .ok_or_else(|| Error::InvalidExpression(clause.to_string()))?;
                item.insert(lhs.to_string(), value);
            }
        }
    }
    Ok(())
}

/// Splits on `;` outside string literals, dropping empty clauses
fn split_clauses(expression: &str) -> Result<Vec<&str>, Error> {
    let mut clauses = Vec::new();
    let mut in_literal = false;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match c {
            // a doubled quote toggles twice and stays inside the literal
            '\'' => in_literal = !in_literal,
            ';' if !in_literal => {
                clauses.push(expression[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_literal {
        return Err(Error::InvalidExpression(format!("unterminated string in {}", expression)));
    }
    clauses.push(expression[start..].trim());

    Ok(clauses.into_iter().filter(|c| !c.is_empty()).collect())
}

fn parse_value(value: &str) -> Option<AttributeValue> {
    if let Some(args) = value.strip_prefix("init_array(").and_then(|v| v.strip_suffix(')')) {
        let (size, kind) = args.split_once(',')?;
        if kind.trim() != "'int'" {
            return None;
        }
        return Some(AttributeValue::IntArray(vec![0; size.trim().parse().ok()?]));
    }

    if let Some(literal) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        // a lone quote inside the literal is malformed
        if literal.replace("''", "").contains('\'') {
            return None;
        }
        return Some(AttributeValue::Str(literal.replace("''", "'")));
    }

    value.parse().ok().map(AttributeValue::Int)
}
