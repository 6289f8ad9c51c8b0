//! Recursive-descent parser for the supported Enso subset.
//!
//! Parsing is line-oriented: the token stream is split into lines, blocks are
//! delimited by indentation, and each line is parsed as a statement. Syntax the
//! grammar does not cover is kept in `Invalid` trees so the result always
//! reproduces the input; only exceeding the nesting limit is an error.

use crate::error::{ParseError, ParseResult};
use crate::lexer::lex;
use crate::tree::{Item, Span, Token, TokenKind, Tree, TreeKind};

/// Maximum depth of nested blocks and expressions.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

fn precedence(op: &str) -> (u8, Assoc) {
    match op {
        "<|" => (1, Assoc::Right),
        "|>" => (1, Assoc::Left),
        "->" => (2, Assoc::Right),
        "||" => (3, Assoc::Left),
        "&&" => (4, Assoc::Left),
        "==" | "!=" | "<" | "<=" | ">" | ">=" => (5, Assoc::Left),
        "+" | "-" => (6, Assoc::Left),
        "*" | "/" | "%" => (7, Assoc::Left),
        "^" => (8, Assoc::Right),
        _ => (5, Assoc::Left),
    }
}

fn leaf(kind: TreeKind, token: Token) -> Tree {
    Tree::new(kind, vec![Item::Token(token)])
}

/// A source line: the newline that precedes it (absent for the first line) and its tokens.
struct Line {
    newline: Option<Token>,
    tokens: Vec<Token>,
}

impl Line {
    fn is_blank(&self) -> bool {
        self.tokens.iter().all(|t| t.kind == TokenKind::Comment)
    }

    fn indent(&self) -> usize {
        self.tokens.first().map(|t| t.whitespace.len()).unwrap_or(0)
    }

    fn starts_with_doc(&self) -> bool {
        self.tokens.first().is_some_and(|t| t.kind == TokenKind::DocComment)
    }
}

fn split_lines(tokens: Vec<Token>) -> Vec<Line> {
    let mut lines = vec![Line { newline: None, tokens: Vec::new() }];
    for token in tokens {
        if token.kind == TokenKind::Newline {
            lines.push(Line { newline: Some(token), tokens: Vec::new() });
        } else if let Some(line) = lines.last_mut() {
            line.tokens.push(token);
        }
    }
    lines
}

/// End (exclusive) of the run of lines after `start` that are blank or indented
/// deeper than `indent`. Trailing blank lines are not part of the run.
fn indented_run(lines: &[Line], start: usize, indent: usize) -> usize {
    let mut end = start + 1;
    while end < lines.len() && (lines[end].is_blank() || lines[end].indent() > indent) {
        end += 1;
    }
    while end > start + 1 && lines[end - 1].is_blank() {
        end -= 1;
    }
    end
}

/// Index of the first `=` not nested in brackets.
fn top_level_equals(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::OpenParen | TokenKind::OpenBracket => depth += 1,
            TokenKind::CloseParen | TokenKind::CloseBracket => depth = depth.saturating_sub(1),
            TokenKind::Equals if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

pub struct Parser<'s> {
    source: &'s str,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str) -> Self {
        Self { source }
    }

    /// Parse the whole source as a block of lines.
    pub fn parse_block(&self) -> ParseResult<Tree> {
        let lexed = lex(self.source);
        let lines = split_lines(lexed.tokens);
        let mut children = self.parse_lines(&lines, 0)?;
        if !lexed.trailing_whitespace.is_empty() {
            children.push(Item::Token(Token::new(
                TokenKind::Newline,
                lexed.trailing_whitespace,
                Span::point(self.source.len()),
            )));
        }
        Ok(Tree::new(TreeKind::BodyBlock, children))
    }

    fn check_depth(&self, depth: usize, pos: usize) -> ParseResult<()> {
        if depth > MAX_NESTING {
            Err(ParseError::nesting_too_deep(pos, MAX_NESTING))
        } else {
            Ok(())
        }
    }

    fn parse_lines(&self, lines: &[Line], depth: usize) -> ParseResult<Vec<Item>> {
        let pos = lines
            .first()
            .and_then(|l| l.newline.or_else(|| l.tokens.first().copied()))
            .map(|t| t.code.start)
            .unwrap_or(0);
        self.check_depth(depth, pos)?;

        let mut items = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = &lines[i];
            items.extend(line.newline.map(Item::Token));
            if line.is_blank() {
                items.extend(line.tokens.iter().copied().map(Item::Token));
                i += 1;
            } else if line.starts_with_doc() {
                i = self.parse_documented(lines, i, depth, &mut items)?;
            } else {
                let (statement, comment, next) = self.parse_statement(lines, i, depth)?;
                items.push(Item::Tree(statement));
                items.extend(comment.map(Item::Token));
                i = next;
            }
        }
        Ok(items)
    }

    /// A `##` comment absorbs its more-indented continuation lines and documents
    /// the statement on the following line, if that line is at the same indent.
    fn parse_documented(
        &self,
        lines: &[Line],
        start: usize,
        depth: usize,
        items: &mut Vec<Item>,
    ) -> ParseResult<usize> {
        let doc_line = &lines[start];
        let Some(&first) = doc_line.tokens.first() else {
            return Ok(start + 1);
        };
        let indent = doc_line.indent();
        let end = indented_run(lines, start, indent);

        let mut doc = first;
        if let Some(last) = lines[start + 1..end].iter().rev().find_map(|l| l.tokens.last()) {
            doc.code.end = last.code.end;
        }

        let statement_line = lines
            .get(end)
            .filter(|l| !l.is_blank() && !l.starts_with_doc() && l.indent() == indent);
        match statement_line {
            Some(line) => {
                let (statement, comment, next) = self.parse_statement(lines, end, depth)?;
                let mut children = vec![Item::Token(doc)];
                children.extend(line.newline.map(Item::Token));
                children.push(Item::Tree(statement));
                items.push(Item::Tree(Tree::new(TreeKind::Documented, children)));
                items.extend(comment.map(Item::Token));
                Ok(next)
            }
            None => {
                items.push(Item::Tree(Tree::new(TreeKind::Documented, vec![Item::Token(doc)])));
                Ok(end)
            }
        }
    }

    /// Parse the statement on line `index`. Returns the statement, a trailing
    /// comment that belongs after it in the enclosing block, and the next line.
    fn parse_statement(
        &self,
        lines: &[Line],
        index: usize,
        depth: usize,
    ) -> ParseResult<(Tree, Option<Token>, usize)> {
        let line = &lines[index];
        let (tokens, mut comment) = match line.tokens.split_last() {
            Some((last, rest)) if last.kind == TokenKind::Comment => (rest, Some(*last)),
            _ => (&line.tokens[..], None),
        };

        let eq = match top_level_equals(tokens) {
            Some(eq) if eq > 0 => eq,
            _ => return Ok((self.parse_expression_tokens(tokens, depth)?, comment, index + 1)),
        };
        let (lhs, equals, rhs) = (&tokens[..eq], tokens[eq], &tokens[eq + 1..]);

        let body_end = if rhs.is_empty() {
            indented_run(lines, index, line.indent())
        } else {
            index + 1
        };
        let has_body = body_end > index + 1;
        let is_function = lhs[0].kind == TokenKind::Ident
            && ((lhs.len() > 1
                && lhs[1..].iter().all(|t| matches!(t.kind, TokenKind::Ident | TokenKind::Wildcard)))
                || (lhs.len() == 1 && has_body));

        let mut children = Vec::new();
        if is_function {
            for token in lhs {
                let kind = match token.kind {
                    TokenKind::Wildcard => TreeKind::Wildcard,
                    _ => TreeKind::Ident,
                };
                children.push(Item::Tree(leaf(kind, *token)));
            }
        } else {
            children.push(Item::Tree(self.parse_expression_tokens(lhs, depth)?));
        }
        children.push(Item::Token(equals));

        if has_body {
            // A comment on the header line precedes the body.
            children.extend(comment.take().map(Item::Token));
            let body = self.parse_lines(&lines[index + 1..body_end], depth + 1)?;
            children.push(Item::Tree(Tree::new(TreeKind::BodyBlock, body)));
        } else if !rhs.is_empty() {
            children.push(Item::Tree(self.parse_expression_tokens(rhs, depth)?));
        }

        let kind = if is_function { TreeKind::Function } else { TreeKind::Assignment };
        Ok((Tree::new(kind, children), comment, body_end))
    }

    /// Parse a token sequence as one expression; anything left over is wrapped
    /// with the parsed parts in an `Invalid` tree.
    fn parse_expression_tokens(&self, tokens: &[Token], depth: usize) -> ParseResult<Tree> {
        let mut parser = ExprParser::new(self.source, tokens);
        let first = parser.parse_expr(0, depth)?;
        if parser.at_end() {
            if let Some(tree) = first {
                return Ok(tree);
            }
        }
        let mut children: Vec<Item> = first.into_iter().map(Item::Tree).collect();
        while let Some(token) = parser.bump() {
            children.push(Item::Token(token));
            if let Some(tree) = parser.parse_expr(0, depth)? {
                children.push(Item::Tree(tree));
            }
        }
        Ok(Tree::new(TreeKind::Invalid, children))
    }
}

struct ExprParser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        Self { source, tokens, pos: 0 }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check_depth(&self, depth: usize) -> ParseResult<()> {
        if depth > MAX_NESTING {
            let pos = self.peek().map(|t| t.code.start).unwrap_or(self.source.len());
            Err(ParseError::nesting_too_deep(pos, MAX_NESTING))
        } else {
            Ok(())
        }
    }

    fn parse_expr(&mut self, min_prec: u8, depth: usize) -> ParseResult<Option<Tree>> {
        self.check_depth(depth)?;
        let mut lhs = match self.parse_app(depth)? {
            Some(tree) => tree,
            None => match self.peek() {
                // Section with a missing left operand, e.g. `(+ 1)`.
                Some(op) if op.kind == TokenKind::Operator => {
                    self.pos += 1;
                    let (prec, _) = precedence(op.code(self.source));
                    let mut children = vec![Item::Token(op)];
                    children.extend(self.parse_expr(prec + 1, depth + 1)?.map(Item::Tree));
                    Tree::new(TreeKind::OprApp, children)
                }
                _ => return Ok(None),
            },
        };

        while let Some(op) = self.peek() {
            if op.kind != TokenKind::Operator {
                break;
            }
            let (prec, assoc) = precedence(op.code(self.source));
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let next_min = match assoc {
                Assoc::Left => prec + 1,
                Assoc::Right => prec,
            };
            let mut children = vec![Item::Tree(lhs), Item::Token(op)];
            children.extend(self.parse_expr(next_min, depth + 1)?.map(Item::Tree));
            lhs = Tree::new(TreeKind::OprApp, children);
        }
        Ok(Some(lhs))
    }

    fn parse_app(&mut self, depth: usize) -> ParseResult<Option<Tree>> {
        let Some(mut func) = self.parse_operand(depth)? else {
            return Ok(None);
        };
        while self.at_operand_start() {
            let Some(arg) = self.parse_operand(depth)? else {
                break;
            };
            func = Tree::new(TreeKind::App, vec![Item::Tree(func), Item::Tree(arg)]);
        }
        Ok(Some(func))
    }

    fn at_operand_start(&self) -> bool {
        match self.peek_kind() {
            Some(
                TokenKind::Ident
                | TokenKind::Wildcard
                | TokenKind::Number
                | TokenKind::TextStart
                | TokenKind::OpenParen
                | TokenKind::OpenBracket,
            ) => true,
            Some(TokenKind::Operator) => self.is_unary_minus(),
            _ => false,
        }
    }

    /// `-` directly attached to a number, and not directly attached to a preceding operand.
    fn is_unary_minus(&self) -> bool {
        let Some(op) = self.peek() else {
            return false;
        };
        if op.kind != TokenKind::Operator || op.code(self.source) != "-" {
            return false;
        }
        let attached_number = self
            .tokens
            .get(self.pos + 1)
            .is_some_and(|next| next.kind == TokenKind::Number && next.whitespace.is_empty());
        if !attached_number {
            return false;
        }
        let follows_operand = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .is_some_and(|prev| {
                matches!(
                    prev.kind,
                    TokenKind::Ident
                        | TokenKind::Wildcard
                        | TokenKind::Number
                        | TokenKind::TextSection
                        | TokenKind::TextEnd
                        | TokenKind::CloseParen
                        | TokenKind::CloseBracket
                )
            });
        !follows_operand || !op.whitespace.is_empty()
    }

    fn parse_operand(&mut self, depth: usize) -> ParseResult<Option<Tree>> {
        self.check_depth(depth)?;
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        let mut tree = match token.kind {
            TokenKind::Ident => {
                self.pos += 1;
                leaf(TreeKind::Ident, token)
            }
            TokenKind::Wildcard => {
                self.pos += 1;
                leaf(TreeKind::Wildcard, token)
            }
            TokenKind::Number => {
                self.pos += 1;
                leaf(TreeKind::Number, token)
            }
            TokenKind::TextStart => self.parse_text(),
            TokenKind::Operator if self.is_unary_minus() => {
                self.pos += 1;
                let mut children = vec![Item::Token(token)];
                children.extend(self.bump().map(|n| Item::Tree(leaf(TreeKind::Number, n))));
                Tree::new(TreeKind::UnaryOprApp, children)
            }
            TokenKind::OpenParen => self.parse_group(depth)?,
            TokenKind::OpenBracket => self.parse_vector(depth)?,
            _ => return Ok(None),
        };

        while self.peek_kind() == Some(TokenKind::Dot) {
            let Some(dot) = self.bump() else {
                break;
            };
            let mut children = vec![Item::Tree(tree), Item::Token(dot)];
            let has_name = self.peek_kind() == Some(TokenKind::Ident);
            if has_name {
                children.extend(self.bump().map(|t| Item::Tree(leaf(TreeKind::Ident, t))));
            }
            tree = Tree::new(TreeKind::PropertyAccess, children);
            if !has_name {
                break;
            }
        }
        Ok(Some(tree))
    }

    fn parse_text(&mut self) -> Tree {
        let mut children = Vec::new();
        children.extend(self.bump().map(Item::Token));
        if self.peek_kind() == Some(TokenKind::TextSection) {
            children.extend(self.bump().map(Item::Token));
        }
        if self.peek_kind() == Some(TokenKind::TextEnd) {
            children.extend(self.bump().map(Item::Token));
        }
        Tree::new(TreeKind::Text, children)
    }

    fn parse_group(&mut self, depth: usize) -> ParseResult<Tree> {
        let mut children: Vec<Item> = self.bump().map(Item::Token).into_iter().collect();
        children.extend(self.parse_expr(0, depth + 1)?.map(Item::Tree));
        if self.peek_kind() == Some(TokenKind::CloseParen) {
            children.extend(self.bump().map(Item::Token));
        }
        Ok(Tree::new(TreeKind::Group, children))
    }

    fn parse_vector(&mut self, depth: usize) -> ParseResult<Tree> {
        let mut children: Vec<Item> = self.bump().map(Item::Token).into_iter().collect();
        loop {
            match self.peek_kind() {
                Some(TokenKind::CloseBracket) => {
                    children.extend(self.bump().map(Item::Token));
                    break;
                }
                Some(TokenKind::Comma) => children.extend(self.bump().map(Item::Token)),
                _ => match self.parse_expr(0, depth + 1)? {
                    Some(element) => children.push(Item::Tree(element)),
                    None => break,
                },
            }
        }
        Ok(Tree::new(TreeKind::Vector, children))
    }
}

/// Parse a module: a block of top-level lines.
pub fn parse_module(source: &str) -> ParseResult<Tree> {
    Parser::new(source).parse_block()
}

/// Parse text as a block of lines with the same grammar as a module body.
pub fn parse_block(source: &str) -> ParseResult<Tree> {
    Parser::new(source).parse_block()
}

/// Parse text consisting of exactly one expression. Returns `None` if the text is
/// empty, contains statements or several lines, or does not parse cleanly.
pub fn parse_expression(source: &str) -> ParseResult<Option<Tree>> {
    let block = parse_block(source)?;
    if block.children.len() != 1 {
        return Ok(None);
    }
    Ok(block.children.into_iter().next().and_then(|item| match item {
        Item::Tree(tree) if !tree.kind.is_statement() && tree.kind != TreeKind::Invalid => Some(tree),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(tree: &Tree, source: &str) -> String {
        match tree.kind {
            TreeKind::Ident | TreeKind::Number | TreeKind::Wildcard | TreeKind::Text => {
                tree.code(source).to_string()
            }
            _ => {
                let parts: Vec<String> = tree
                    .children
                    .iter()
                    .map(|item| match item {
                        Item::Tree(t) => shape(t, source),
                        Item::Token(t) => t.code(source).to_string(),
                    })
                    .collect();
                format!("{:?}({})", tree.kind, parts.join(" "))
            }
        }
    }

    fn expr_shape(source: &str) -> String {
        let tree = parse_expression(source).unwrap().expect("single expression");
        shape(&tree, source)
    }

    #[test]
    fn test_application_is_left_associative() {
        assert_eq!(expr_shape("f a b"), "App(App(f a) b)");
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(expr_shape("a + b * c"), "OprApp(a + OprApp(b * c))");
        assert_eq!(expr_shape("a - b - c"), "OprApp(OprApp(a - b) - c)");
        assert_eq!(expr_shape("f x + 1"), "OprApp(App(f x) + 1)");
    }

    #[test]
    fn test_property_access_binds_tightest() {
        assert_eq!(
            expr_shape("Table.input __"),
            "App(PropertyAccess(Table . input) __)"
        );
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(expr_shape("f -1"), "App(f UnaryOprApp(- 1))");
        assert_eq!(expr_shape("a-1"), "OprApp(a - 1)");
        assert_eq!(expr_shape("a - 1"), "OprApp(a - 1)");
    }

    #[test]
    fn test_vector_and_group() {
        assert_eq!(expr_shape("[1, (a)]"), "Vector([ 1 , Group(( a )) ])");
    }

    #[test]
    fn test_section() {
        assert_eq!(expr_shape("(+ 1)"), "Group(( OprApp(+ 1) ))");
    }

    #[test]
    fn test_statements() {
        let source = "x = 1\nf a b = a + b\nmain =\n    y = f x 2\n    y";
        let block = parse_module(source).unwrap();
        let kinds: Vec<_> = block.child_trees().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TreeKind::Assignment, TreeKind::Function, TreeKind::Function]);

        let main = block.child_trees().nth(2).unwrap();
        let body = main.child_trees().last().unwrap();
        assert_eq!(body.kind, TreeKind::BodyBlock);
        assert_eq!(body.child_trees().count(), 2);
    }

    #[test]
    fn test_documented_statement() {
        let source = "main =\n    ## A multiline\n       component comment\n    x = 1";
        let block = parse_module(source).unwrap();
        let main = block.child_trees().next().unwrap();
        let body = main.child_trees().last().unwrap();
        let documented = body.child_trees().next().unwrap();
        assert_eq!(documented.kind, TreeKind::Documented);
        let doc = documented.first_token().unwrap();
        assert_eq!(doc.code(source), "## A multiline\n       component comment");
        assert_eq!(documented.child_trees().next().unwrap().kind, TreeKind::Assignment);
    }

    #[test]
    fn test_invalid_is_lossless() {
        for source in ["x = = 1", "f x)", ") (", "a @ b", "[1, 2", "x = 'unterminated"] {
            let block = parse_module(source).unwrap();
            assert_eq!(block.print(source), source);
        }
    }

    #[test]
    fn test_header_comment_precedes_body() {
        let source = "main = # entry\n    42";
        let block = parse_module(source).unwrap();
        assert_eq!(block.print(source), source);
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!("{}1{}", "(".repeat(MAX_NESTING + 10), ")".repeat(MAX_NESTING + 10));
        assert!(matches!(
            parse_module(&source),
            Err(ParseError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_parse_expression_rejects_statements() {
        assert!(parse_expression("x = 1").unwrap().is_none());
        assert!(parse_expression("a\nb").unwrap().is_none());
        assert!(parse_expression("").unwrap().is_none());
    }
}
