//! Recursive-descent implementation of the surface query grammar.
//!
//! Each alternative that has partially matched commits: once a keyword
//! like `where`/`under`/`size` is consumed, anything that follows it
//! must complete that production or the parser raises a `ClientInput`
//! error naming the position and what was expected, rather than
//! backtracking silently.

use std::collections::{BTreeMap, HashMap};

use super::lexer::{describe_position, Token, TokenCategory};
use crate::error::SelError;
use crate::ir::{Aggregation, AggregationType, Comparator, FilterValue, GroupOperator, Node, OrderedMap, Sort, SortMode, SortOrder};

const AGGREG_TYPES: &[(&str, AggregationType)] = &[
    ("aggreg", AggregationType::Aggreg),
    ("histogram", AggregationType::Histogram),
    ("count", AggregationType::Count),
    ("distinct", AggregationType::Distinct),
    ("min", AggregationType::Min),
    ("max", AggregationType::Max),
    ("sum", AggregationType::Sum),
    ("average", AggregationType::Average),
    ("stats", AggregationType::Stats),
];

fn aggregation_type_str(t: AggregationType) -> &'static str {
    AGGREG_TYPES.iter().find(|(_, ty)| *ty == t).map(|(s, _)| *s).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueShape {
    Scalar,
    List,
    RangeTuple,
}

pub struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, tokens: Vec<Token>) -> Self {
        Parser { input, tokens, pos: 0 }
    }

    // ---- token-stream primitives -----------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn peek_word_ci(&self, ahead: usize, word: &str) -> bool {
        self.tokens
            .get(self.pos + ahead)
            .map(|t| t.category == TokenCategory::Word && !t.quoted && t.text.eq_ignore_ascii_case(word))
            .unwrap_or(false)
    }

    fn peek_symbol(&self, symbol: &str) -> bool {
        self.peek()
            .map(|t| t.category == TokenCategory::Symbol && t.text == symbol)
            .unwrap_or(false)
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), SelError> {
        if self.peek_symbol(symbol) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("'{symbol}'")))
        }
    }

    fn expect_word_ci(&mut self, word: &str) -> Result<(), SelError> {
        if self.peek_word_ci(0, word) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("'{word}'")))
        }
    }

    fn parse_value(&mut self) -> Result<String, SelError> {
        match self.peek() {
            Some(t) if t.category == TokenCategory::Word => {
                let text = t.text.clone();
                self.advance();
                Ok(text)
            }
            _ => Err(self.error_here("a value")),
        }
    }

    fn parse_name(&mut self) -> Result<String, SelError> {
        match self.peek() {
            Some(t) if t.category == TokenCategory::Word && !t.quoted => {
                let text = t.text.clone();
                self.advance();
                Ok(text)
            }
            _ => Err(self.error_here("a name")),
        }
    }

    fn parse_field_path(&mut self) -> Result<String, SelError> {
        match self.peek() {
            Some(t) if t.category == TokenCategory::Word && !t.quoted => {
                let text = t.text.clone();
                self.advance();
                Ok(text)
            }
            _ => Err(self.error_here("a field path")),
        }
    }

    fn peek_numeric_comparator(&self) -> Option<&'static str> {
        self.peek().filter(|t| t.category == TokenCategory::Comparator).and_then(|t| match t.text.as_str() {
            ">=" => Some(">="),
            ">" => Some(">"),
            "<=" => Some("<="),
            "<" => Some("<"),
            _ => None,
        })
    }

    fn expect_numeric_comparator(&mut self) -> Result<&'static str, SelError> {
        match self.peek_numeric_comparator() {
            Some(s) => {
                self.advance();
                Ok(s)
            }
            None => Err(self.error_here("a numerical comparator (>, >=, <, <=)")),
        }
    }

    fn peek_filter_comparator(&self) -> Option<(Comparator, ValueShape, usize)> {
        let t = self.peek()?;
        if t.quoted {
            return None;
        }
        if t.category == TokenCategory::Comparator {
            let c = match t.text.as_str() {
                "!=" => Comparator::Ne,
                "!~" => Comparator::NotMatch,
                ">=" => Comparator::Gte,
                "<=" => Comparator::Lte,
                ">" => Comparator::Gt,
                "<" => Comparator::Lt,
                "=" => Comparator::Eq,
                "~" => Comparator::Match,
                _ => return None,
            };
            return Some((c, ValueShape::Scalar, 1));
        }
        if t.category == TokenCategory::Word {
            if t.text.eq_ignore_ascii_case("prefix") {
                return Some((Comparator::Prefix, ValueShape::Scalar, 1));
            }
            if t.text.eq_ignore_ascii_case("nprefix") {
                return Some((Comparator::Nprefix, ValueShape::Scalar, 1));
            }
            if t.text.eq_ignore_ascii_case("in") {
                return Some((Comparator::In, ValueShape::List, 1));
            }
            if t.text.eq_ignore_ascii_case("nin") {
                return Some((Comparator::Nin, ValueShape::List, 1));
            }
            if t.text.eq_ignore_ascii_case("range") {
                return Some((Comparator::Range, ValueShape::RangeTuple, 1));
            }
            if t.text.eq_ignore_ascii_case("nrange") {
                return Some((Comparator::Nrange, ValueShape::RangeTuple, 1));
            }
            if t.text.eq_ignore_ascii_case("not") {
                if let Some(t2) = self.tokens.get(self.pos + 1) {
                    if t2.category == TokenCategory::Word && !t2.quoted {
                        if t2.text.eq_ignore_ascii_case("prefix") {
                            return Some((Comparator::Nprefix, ValueShape::Scalar, 2));
                        }
                        if t2.text.eq_ignore_ascii_case("in") {
                            return Some((Comparator::Nin, ValueShape::List, 2));
                        }
                        if t2.text.eq_ignore_ascii_case("range") {
                            return Some((Comparator::Nrange, ValueShape::RangeTuple, 2));
                        }
                    }
                }
            }
        }
        None
    }

    // ---- diagnostics --------------------------------------------------

    fn error_here(&self, expected: &str) -> SelError {
        let offset = self.peek().map(|t| t.offset).unwrap_or(self.input.len());
        let (line, column) = describe_position(self.input, offset);
        let last_consumed = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.text.clone());
        let remaining = &self.input[offset.min(self.input.len())..];
        let snippet: String = remaining.trim_start().chars().take(40).collect();
        let after = match last_consumed {
            Some(tok) => format!(" after '{tok}'"),
            None => String::new(),
        };
        let found = if snippet.is_empty() {
            "nothing".to_string()
        } else {
            format!("\"{snippet}\"")
        };
        SelError::client_input(format!(
            "invalid syntax at line {line}, column {column}{after}: expected {expected}, found {found}"
        ))
    }

    // ---- top level ------------------------------------------------------

    pub fn parse_query(mut self) -> Result<crate::ir::Query, SelError> {
        let query = if self.peek_is_group_start() {
            Some(self.parse_no_bracket_group()?)
        } else {
            None
        };

        let mut aggregations = OrderedMap::new();
        let mut counters: HashMap<AggregationType, usize> = HashMap::new();
        while self.peek_is_aggreg_type() {
            let (name, agg) = self.parse_aggreg(&mut counters)?;
            aggregations.push(name, agg);
        }

        let mut sort = Vec::new();
        while self.peek_word_ci(0, "sort") {
            sort.push(self.parse_sort()?);
        }

        if self.pos < self.tokens.len() {
            return Err(self.error_here("an aggregation, a sort, or end of input"));
        }

        Ok(crate::ir::Query { query, aggregations, sort })
    }

    fn peek_is_aggreg_type(&self) -> bool {
        AGGREG_TYPES.iter().any(|(word, _)| self.peek_word_ci(0, word))
    }

    fn peek_is_group_start(&self) -> bool {
        self.peek().is_some() && !self.peek_is_aggreg_type() && !self.peek_word_ci(0, "sort")
    }

    // ---- group / element --------------------------------------------

    fn parse_no_bracket_group(&mut self) -> Result<Node, SelError> {
        let mut elements = vec![self.parse_element()?];
        let mut operators = Vec::new();
        loop {
            if self.peek_word_ci(0, "and") {
                self.advance();
                operators.push(GroupOperator::And);
                elements.push(self.parse_element()?);
            } else if self.peek_word_ci(0, "or") {
                self.advance();
                operators.push(GroupOperator::Or);
                elements.push(self.parse_element()?);
            } else {
                break;
            }
        }
        Ok(build_precedence(elements, operators))
    }

    fn parse_element(&mut self) -> Result<Node, SelError> {
        if self.peek_symbol("(") {
            self.advance();
            let inner = self.parse_no_bracket_group()?;
            self.expect_symbol(")")?;
            return Ok(inner);
        }
        if self.peek_word_ci(0, "not") {
            self.advance();
            let inner = self.parse_element()?;
            return Ok(Node::Not { inner: Box::new(inner) });
        }
        self.parse_leaf_element()
    }

    fn parse_leaf_element(&mut self) -> Result<Node, SelError> {
        let first = match self.peek() {
            Some(t) if t.category == TokenCategory::Word => t.clone(),
            _ => return Err(self.error_here("a field path, value, or quoted string")),
        };
        self.advance();

        if self.peek_numeric_comparator().is_some() {
            return self.parse_range_filter_tail(first.text);
        }

        if let Some((comparator, shape, count)) = self.peek_filter_comparator() {
            for _ in 0..count {
                self.advance();
            }
            return self.parse_filter_tail(first.text, comparator, shape);
        }

        if self.peek_word_ci(0, "where") {
            self.advance();
            self.expect_symbol("(")?;
            let inner = self.parse_no_bracket_group()?;
            self.expect_symbol(")")?;
            return Ok(Node::Context {
                field: first.text,
                r#where: Box::new(inner),
            });
        }

        if first.quoted {
            return Ok(Node::QueryString { query: first.text });
        }

        Err(self.error_here("a comparator or 'where'"))
    }

    fn parse_optional_where(&mut self) -> Result<Option<Box<Node>>, SelError> {
        if self.peek_word_ci(0, "where") {
            self.advance();
            Ok(Some(Box::new(self.parse_element()?)))
        } else {
            Ok(None)
        }
    }

    fn parse_filter_tail(&mut self, field: String, comparator: Comparator, shape: ValueShape) -> Result<Node, SelError> {
        let value = match shape {
            ValueShape::Scalar => FilterValue::Scalar(self.parse_value()?),
            ValueShape::List => {
                self.expect_symbol("[")?;
                let mut values = vec![self.parse_value()?];
                while self.peek_symbol(",") {
                    self.advance();
                    values.push(self.parse_value()?);
                }
                self.expect_symbol("]")?;
                FilterValue::List(values)
            }
            ValueShape::RangeTuple => {
                self.expect_symbol("(")?;
                let c1 = self.expect_numeric_comparator()?;
                let v1 = self.parse_value()?;
                self.expect_symbol(",")?;
                let c2 = self.expect_numeric_comparator()?;
                let v2 = self.parse_value()?;
                self.expect_symbol(")")?;
                let mut map = BTreeMap::new();
                map.insert(c1.to_string(), v1);
                map.insert(c2.to_string(), v2);
                FilterValue::Range(map)
            }
        };
        let r#where = self.parse_optional_where()?;
        Ok(Node::Filter {
            field,
            comparator,
            value,
            r#where,
        })
    }

    fn parse_range_filter_tail(&mut self, first_value: String) -> Result<Node, SelError> {
        let first_cmp = self.expect_numeric_comparator()?;
        let field = self.parse_field_path()?;
        let second_cmp = self.expect_numeric_comparator()?;
        let second_value = self.parse_value()?;

        let inverted_first = invert_comparator(first_cmp);
        if !is_opposing(inverted_first, second_cmp) {
            return Err(SelError::client_input(format!(
                "invalid range filter on '{field}': comparators must bound the field from both sides"
            )));
        }

        let mut map = BTreeMap::new();
        map.insert(inverted_first.to_string(), first_value);
        map.insert(second_cmp.to_string(), second_value);

        let r#where = self.parse_optional_where()?;
        Ok(Node::Filter {
            field,
            comparator: Comparator::Range,
            value: FilterValue::Range(map),
            r#where,
        })
    }

    // ---- aggregations -------------------------------------------------

    fn expect_aggreg_type(&mut self) -> Result<AggregationType, SelError> {
        for (word, ty) in AGGREG_TYPES {
            if self.peek_word_ci(0, word) {
                self.advance();
                return Ok(*ty);
            }
        }
        Err(self.error_here("an aggregation type"))
    }

    fn parse_aggreg(&mut self, counters: &mut HashMap<AggregationType, usize>) -> Result<(String, Aggregation), SelError> {
        let aggregation_type = self.expect_aggreg_type()?;
        let name = if self.peek_symbol(":") {
            None
        } else {
            Some(self.parse_name()?)
        };
        self.expect_symbol(":")?;
        let field = self.parse_field_path()?;

        let mut agg = Aggregation {
            aggregation_type,
            field,
            name: name.clone(),
            size: None,
            interval: None,
            under: None,
            r#where: None,
            graph: None,
            subaggreg: OrderedMap::new(),
        };
        self.parse_aggreg_params(&mut agg)?;

        let final_name = match name {
            Some(n) => n,
            None => {
                let idx = counters.entry(aggregation_type).or_insert(0);
                let generated = format!("{}_{}", aggregation_type_str(aggregation_type), idx);
                *idx += 1;
                generated
            }
        };

        Ok((final_name, agg))
    }

    fn parse_aggreg_params(&mut self, agg: &mut Aggregation) -> Result<(), SelError> {
        loop {
            if self.peek_word_ci(0, "subaggreg") {
                self.advance();
                let name = self.parse_name()?;
                self.expect_symbol("(")?;
                let mut local_counters = HashMap::new();
                let (_, inner) = self.parse_aggreg(&mut local_counters)?;
                self.expect_symbol(")")?;
                agg.subaggreg.push(name, inner);
            } else if self.peek_word_ci(0, "interval") {
                self.advance();
                agg.interval = Some(self.parse_value()?);
            } else if self.peek_word_ci(0, "size") {
                self.advance();
                let v = self.parse_value()?;
                let n: u64 = v
                    .parse()
                    .map_err(|_| SelError::client_input(format!("expected an integer after 'size', found '{v}'")))?;
                agg.size = Some(n);
            } else if self.peek_word_ci(0, "under") {
                self.advance();
                agg.under = Some(self.parse_field_path()?);
            } else if self.peek_word_ci(0, "where") {
                self.advance();
                agg.r#where = Some(self.parse_element()?);
            } else if self.peek_word_ci(0, "graph") {
                self.advance();
                agg.graph = Some(self.parse_name()?);
            } else {
                break;
            }
        }
        Ok(())
    }

    // ---- sort -----------------------------------------------------------

    fn parse_sort(&mut self) -> Result<Sort, SelError> {
        self.expect_word_ci("sort")?;
        self.expect_symbol(":")?;
        let field = self.parse_field_path()?;

        let order = if self.peek_word_ci(0, "asc") {
            self.advance();
            Some(SortOrder::Asc)
        } else if self.peek_word_ci(0, "desc") {
            self.advance();
            Some(SortOrder::Desc)
        } else {
            None
        };

        let mut sort = Sort {
            field,
            order,
            mode: None,
            under: None,
            r#where: None,
            seed: None,
            auto_sort: false,
        };

        loop {
            if self.peek_word_ci(0, "seed") {
                self.advance();
                let v = self.parse_value()?;
                let n: i64 = v
                    .parse()
                    .map_err(|_| SelError::client_input(format!("expected an integer after 'seed', found '{v}'")))?;
                sort.seed = Some(n);
            } else if self.peek_word_ci(0, "mode") {
                self.advance();
                let v = self.parse_name()?;
                sort.mode = Some(parse_sort_mode(&v)?);
            } else if self.peek_word_ci(0, "under") {
                self.advance();
                sort.under = Some(self.parse_field_path()?);
            } else if self.peek_word_ci(0, "where") {
                self.advance();
                sort.r#where = Some(self.parse_element()?);
            } else {
                break;
            }
        }

        Ok(sort)
    }
}

fn invert_comparator(c: &str) -> &'static str {
    match c {
        ">" => "<",
        ">=" => "<=",
        "<" => ">",
        "<=" => ">=",
        other => unreachable!("not a numerical comparator: {other}"),
    }
}

fn is_opposing(a: &str, b: &str) -> bool {
    let is_lower = |s: &str| s == "<" || s == "<=";
    let is_upper = |s: &str| s == ">" || s == ">=";
    (is_upper(a) && is_lower(b)) || (is_lower(a) && is_upper(b))
}

fn parse_sort_mode(s: &str) -> Result<SortMode, SelError> {
    match s.to_ascii_lowercase().as_str() {
        "min" => Ok(SortMode::Min),
        "max" => Ok(SortMode::Max),
        "sum" => Ok(SortMode::Sum),
        "avg" => Ok(SortMode::Avg),
        "median" => Ok(SortMode::Median),
        other => Err(SelError::client_input(format!("unknown sort mode '{other}'"))),
    }
}

fn build_precedence(mut elements: Vec<Node>, operators: Vec<GroupOperator>) -> Node {
    let mut segments: Vec<Vec<Node>> = vec![vec![elements.remove(0)]];
    for (op, node) in operators.into_iter().zip(elements.into_iter()) {
        match op {
            GroupOperator::And => segments.last_mut().unwrap().push(node),
            GroupOperator::Or => segments.push(vec![node]),
        }
    }
    let or_items: Vec<Node> = segments.into_iter().map(|seg| collapse(GroupOperator::And, seg)).collect();
    collapse(GroupOperator::Or, or_items)
}

fn collapse(operator: GroupOperator, mut items: Vec<Node>) -> Node {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Node::Group { operator, items }
    }
}
