use std::fmt;

/// Markup that is safe to emit verbatim: either escaped text or output of
/// [`HtmlBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Escape plain text into markup.
    pub fn from_text(text: &str) -> Self {
        Self(escape(text))
    }

    /// Wrap markup the caller has already escaped.
    pub(crate) fn from_trusted(html: String) -> Self {
        Self(html)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape `&`, `<`, `>`, and quotes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

#[derive(Debug)]
struct PendingTag {
    tag: &'static str,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
}

/// Streaming markup writer.
///
/// An opened element stays pending until content is appended or it is
/// closed, so class names and attributes may be set right after opening.
#[derive(Debug, Default)]
pub struct HtmlBuilder {
    out: String,
    stack: Vec<&'static str>,
    pending: Option<PendingTag>,
}

impl HtmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_element(&mut self, tag: &'static str) -> &mut Self {
        self.flush_pending();
        self.stack.push(tag);
        self.pending = Some(PendingTag {
            tag,
            classes: Vec::new(),
            attrs: Vec::new(),
        });
        self
    }

    pub fn close_element(&mut self, tag: &'static str) -> &mut Self {
        self.flush_pending();
        let open = self.stack.pop();
        debug_assert_eq!(open, Some(tag), "mismatched close tag");
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        self
    }

    pub fn open_tr(&mut self) -> &mut Self {
        self.open_element("tr")
    }

    pub fn close_tr(&mut self) -> &mut Self {
        self.close_element("tr")
    }

    pub fn open_td(&mut self) -> &mut Self {
        self.open_element("td")
    }

    pub fn close_td(&mut self) -> &mut Self {
        self.close_element("td")
    }

    pub fn open_anchor(&mut self) -> &mut Self {
        self.open_element("a")
    }

    pub fn close_anchor(&mut self) -> &mut Self {
        self.close_element("a")
    }

    /// Replace every class on the pending element.
    pub fn set_style_name(&mut self, name: &str) -> &mut Self {
        if let Some(p) = self.pending.as_mut() {
            p.classes.clear();
            p.classes.push(name.to_string());
        } else {
            debug_assert!(false, "no pending element for class {name}");
        }
        self
    }

    pub fn add_style_name(&mut self, name: &str) -> &mut Self {
        if let Some(p) = self.pending.as_mut() {
            if !p.classes.iter().any(|c| c == name) {
                p.classes.push(name.to_string());
            }
        } else {
            debug_assert!(false, "no pending element for class {name}");
        }
        self
    }

    pub fn set_attribute(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        if let Some(p) = self.pending.as_mut() {
            let value = value.to_string();
            match p.attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value,
                None => p.attrs.push((name.to_string(), value)),
            }
        } else {
            debug_assert!(false, "no pending element for attribute {name}");
        }
        self
    }

    /// Append escaped text (numbers and strings alike).
    pub fn append(&mut self, text: impl fmt::Display) -> &mut Self {
        self.flush_pending();
        self.out.push_str(&escape(&text.to_string()));
        self
    }

    pub fn append_html(&mut self, html: &SafeHtml) -> &mut Self {
        self.flush_pending();
        self.out.push_str(html.as_str());
        self
    }

    pub fn nbsp(&mut self) -> &mut Self {
        self.flush_pending();
        self.out.push_str("&nbsp;");
        self
    }

    pub fn br(&mut self) -> &mut Self {
        self.flush_pending();
        self.out.push_str("<br />");
        self
    }

    pub fn to_safe_html(mut self) -> SafeHtml {
        self.flush_pending();
        debug_assert!(self.stack.is_empty(), "unclosed elements: {:?}", self.stack);
        SafeHtml(self.out)
    }

    fn flush_pending(&mut self) {
        let Some(p) = self.pending.take() else {
            return;
        };
        self.out.push('<');
        self.out.push_str(p.tag);
        if !p.classes.is_empty() {
            self.out.push_str(" class=\"");
            self.out.push_str(&escape(&p.classes.join(" ")));
            self.out.push('"');
        }
        for (k, v) in &p.attrs {
            self.out.push(' ');
            self.out.push_str(k);
            self.out.push_str("=\"");
            self.out.push_str(&escape(v));
            self.out.push('"');
        }
        self.out.push('>');
    }
}

/// A node of a widget tree built by explicit construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Html(SafeHtml),
}

/// An element descriptor. `field` names the element so owners can look it
/// up after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    pub field: Option<&'static str>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    pub hidden: bool,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            field: None,
            classes: Vec::new(),
            attrs: Vec::new(),
            hidden: false,
            children: Vec::new(),
        }
    }

    pub fn field(mut self, name: &'static str) -> Self {
        self.field = Some(name);
        self
    }

    pub fn class(mut self, name: &str) -> Self {
        self.classes.push(name.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn child(mut self, el: Element) -> Self {
        self.children.push(Node::Element(el));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn html(mut self, html: SafeHtml) -> Self {
        self.children.push(Node::Html(html));
        self
    }

    /// Depth-first lookup of a named element.
    pub fn find_field(&self, name: &str) -> Option<&Element> {
        if self.field == Some(name) {
            return Some(self);
        }
        self.children.iter().find_map(|c| match c {
            Node::Element(el) => el.find_field(name),
            _ => None,
        })
    }

    /// Concatenated text content, ignoring raw markup nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            match c {
                Node::Element(el) => out.push_str(&el.text_content()),
                Node::Text(t) => out.push_str(t),
                Node::Html(_) => {}
            }
        }
        out
    }

    pub fn write(&self, m: &mut HtmlBuilder) {
        m.open_element(self.tag);
        for class in &self.classes {
            m.add_style_name(class);
        }
        if let Some(field) = self.field {
            m.set_attribute("data-field", field);
        }
        for (k, v) in &self.attrs {
            m.set_attribute(k, v);
        }
        if self.hidden {
            m.set_attribute("style", "display:none");
        }
        for c in &self.children {
            match c {
                Node::Element(el) => el.write(m),
                Node::Text(t) => {
                    m.append(t);
                }
                Node::Html(h) => {
                    m.append_html(h);
                }
            }
        }
        m.close_element(self.tag);
    }

    pub fn to_html(&self) -> SafeHtml {
        let mut m = HtmlBuilder::new();
        self.write(&mut m);
        m.to_safe_html()
    }
}

/// Convert a plain-text message into paragraphs, bullet lists and
/// preformatted blocks.
pub fn wikify(text: &str) -> SafeHtml {
    let mut m = HtmlBuilder::new();
    let normalized = text.replace("\r\n", "\n");
    for para in normalized.split("\n\n") {
        if para.trim().is_empty() {
            continue;
        }
        let mut prose: Vec<&str> = Vec::new();
        let mut list: Vec<&str> = Vec::new();
        let mut pre: Vec<&str> = Vec::new();
        for line in para.lines() {
            if let Some(item) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
                flush_prose(&mut m, &mut prose);
                flush_pre(&mut m, &mut pre);
                list.push(item);
            } else if line.starts_with(' ') || line.starts_with('\t') {
                flush_prose(&mut m, &mut prose);
                flush_list(&mut m, &mut list);
                pre.push(line);
            } else {
                flush_list(&mut m, &mut list);
                flush_pre(&mut m, &mut pre);
                prose.push(line);
            }
        }
        flush_prose(&mut m, &mut prose);
        flush_list(&mut m, &mut list);
        flush_pre(&mut m, &mut pre);
    }
    m.to_safe_html()
}

fn flush_prose(m: &mut HtmlBuilder, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }
    m.open_element("p");
    m.append(lines.join("\n"));
    m.close_element("p");
    lines.clear();
}

fn flush_list(m: &mut HtmlBuilder, items: &mut Vec<&str>) {
    if items.is_empty() {
        return;
    }
    m.open_element("ul");
    for item in items.iter() {
        m.open_element("li");
        m.append(item);
        m.close_element("li");
    }
    m.close_element("ul");
    items.clear();
}

fn flush_pre(m: &mut HtmlBuilder, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }
    m.open_element("pre");
    m.append(lines.join("\n"));
    m.close_element("pre");
    lines.clear();
}
