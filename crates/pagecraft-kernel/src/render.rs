//! Block renderer: pure mapping from block content to a display tree.
//!
//! Rendering never fails. Typed content goes through an exhaustive match on
//! [`BlockContent`]; raw payloads (generic blocks, or anything that did not
//! come through the schema) go through [`render_raw`], which reads each field
//! leniently and renders absent or mistyped fields as empty.

use serde_json::Value;

use pagecraft_types::{
    AboutContent, Block, BlockContent, BlockKind, ContactContent, CtaContent, HeroContent,
    ServiceItem, ServicesContent,
};

/// A node of the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    Element {
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<RenderNode>,
    },
    Text(String),
}

impl RenderNode {
    pub fn element(tag: &'static str) -> Self {
        RenderNode::Element {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Text(text.into())
    }

    /// Add an attribute. No-op on text nodes.
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let RenderNode::Element { attrs, .. } = &mut self {
            attrs.push((name, value.into()));
        }
        self
    }

    /// Append a child. No-op on text nodes.
    pub fn child(mut self, node: RenderNode) -> Self {
        if let RenderNode::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = RenderNode>) -> Self {
        if let RenderNode::Element { children, .. } = &mut self {
            children.extend(nodes);
        }
        self
    }

    /// Shorthand for `<tag>text</tag>`.
    fn with_text(tag: &'static str, text: &str) -> Self {
        Self::element(tag).child(Self::text(text))
    }

    pub fn tag(&self) -> Option<&'static str> {
        match self {
            RenderNode::Element { tag, .. } => Some(*tag),
            RenderNode::Text(_) => None,
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        match self {
            RenderNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str()),
            RenderNode::Text(_) => None,
        }
    }

    /// All descendant elements (and self) with the given tag, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<&RenderNode> {
        let mut found = Vec::new();
        self.collect(tag, &mut found);
        found
    }

    fn collect<'a>(&'a self, tag: &str, found: &mut Vec<&'a RenderNode>) {
        if let RenderNode::Element { tag: t, children, .. } = self {
            if *t == tag {
                found.push(self);
            }
            for c in children {
                c.collect(tag, found);
            }
        }
    }

    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        match self {
            RenderNode::Text(t) => t.clone(),
            RenderNode::Element { children, .. } => {
                children.iter().map(RenderNode::text_content).collect()
            }
        }
    }

    /// Serialize as HTML with text and attribute values escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            RenderNode::Text(t) => out.push_str(&escape(t)),
            RenderNode::Element {
                tag,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attrs {
                    out.push_str(&format!(" {k}=\"{}\"", escape(v)));
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for c in children {
                    c.write_html(out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "br" | "hr")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

/// Render a block wrapped in a `section` carrying its identity.
pub fn render_block(block: &Block) -> RenderNode {
    RenderNode::element("section")
        .attr("data-block-id", block.id.to_string())
        .attr("data-block-type", block.kind().as_str())
        .attr("data-ai-generated", block.ai_generated.to_string())
        .child(render_content(&block.content))
}

/// Render all blocks in order.
pub fn render_page(blocks: &[Block]) -> RenderNode {
    RenderNode::element("main").children(blocks.iter().map(render_block))
}

/// Render typed content.
pub fn render_content(content: &BlockContent) -> RenderNode {
    match content {
        BlockContent::Hero(c) => render_hero(c),
        BlockContent::About(c) => render_about(c),
        BlockContent::Services(c) => render_services(c),
        BlockContent::Cta(c) => render_cta(c),
        BlockContent::Contact(c) => render_contact(c),
        BlockContent::Generic(g) => render_raw(&g.kind, &g.payload),
    }
}

/// Render an uninterpreted payload labelled with a type name.
///
/// Known type names are read field by field; anything missing or of the
/// wrong JSON type renders as empty. Unknown names render the payload as
/// pretty-printed JSON.
pub fn render_raw(type_name: &str, payload: &Value) -> RenderNode {
    match BlockKind::from_str(type_name).filter(BlockKind::is_typed) {
        Some(BlockKind::Hero) => render_hero(&HeroContent {
            headline: text(payload, "headline"),
            subheadline: opt_text(payload, "subheadline"),
            cta_text: opt_text(payload, "cta_text"),
            cta_link: opt_text(payload, "cta_link"),
            background_image: opt_text(payload, "background_image"),
        }),
        Some(BlockKind::About) => render_about(&AboutContent {
            title: text(payload, "title"),
            body: text(payload, "body"),
            image: opt_text(payload, "image"),
        }),
        Some(BlockKind::Services) => render_services(&ServicesContent {
            title: text(payload, "title"),
            items: payload
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|item| ServiceItem {
                            title: text(item, "title"),
                            description: text(item, "description"),
                            icon: opt_text(item, "icon"),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }),
        Some(BlockKind::Cta) => render_cta(&CtaContent {
            headline: text(payload, "headline"),
            body: opt_text(payload, "body"),
            button_text: opt_text(payload, "button_text"),
            button_link: opt_text(payload, "button_link"),
        }),
        Some(BlockKind::Contact) => render_contact(&ContactContent {
            title: text(payload, "title"),
            email: opt_text(payload, "email"),
            phone: opt_text(payload, "phone"),
            address: opt_text(payload, "address"),
        }),
        _ => render_opaque(type_name, payload),
    }
}

fn text(v: &Value, field: &str) -> String {
    v.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_text(v: &Value, field: &str) -> Option<String> {
    v.get(field).and_then(Value::as_str).map(str::to_string)
}

fn render_opaque(type_name: &str, payload: &Value) -> RenderNode {
    let body = match payload {
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    RenderNode::element("div")
        .attr("class", "block-generic")
        .attr("data-type", type_name)
        .child(RenderNode::element("pre").child(RenderNode::with_text("code", &body)))
}

fn render_hero(c: &HeroContent) -> RenderNode {
    let mut node = RenderNode::element("header").attr("class", "hero");
    if let Some(bg) = non_empty(&c.background_image) {
        node = node.attr("data-background", bg);
    }
    node = node.child(RenderNode::with_text("h1", &c.headline));
    if let Some(sub) = non_empty(&c.subheadline) {
        node = node.child(RenderNode::with_text("p", sub).attr("class", "subheadline"));
    }
    if let (Some(label), Some(link)) = (non_empty(&c.cta_text), non_empty(&c.cta_link)) {
        node = node.child(button(label, link));
    }
    node
}

fn render_about(c: &AboutContent) -> RenderNode {
    let mut node = RenderNode::element("div")
        .attr("class", "about")
        .child(RenderNode::with_text("h2", &c.title));
    for para in c.body.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        node = node.child(RenderNode::with_text("p", para));
    }
    if let Some(src) = non_empty(&c.image) {
        node = node.child(RenderNode::element("img").attr("src", src).attr("alt", &c.title));
    }
    node
}

fn render_services(c: &ServicesContent) -> RenderNode {
    let items = c.items.iter().map(|item| {
        let mut li = RenderNode::element("li");
        if let Some(icon) = non_empty(&item.icon) {
            li = li.child(RenderNode::element("span").attr("class", "icon").attr("data-icon", icon));
        }
        li.child(RenderNode::with_text("h3", &item.title))
            .child(RenderNode::with_text("p", &item.description))
    });
    RenderNode::element("div")
        .attr("class", "services")
        .child(RenderNode::with_text("h2", &c.title))
        .child(RenderNode::element("ul").children(items))
}

fn render_cta(c: &CtaContent) -> RenderNode {
    let mut node = RenderNode::element("div")
        .attr("class", "cta")
        .child(RenderNode::with_text("h2", &c.headline));
    if let Some(body) = non_empty(&c.body) {
        node = node.child(RenderNode::with_text("p", body));
    }
    if let (Some(label), Some(link)) = (non_empty(&c.button_text), non_empty(&c.button_link)) {
        node = node.child(button(label, link));
    }
    node
}

fn render_contact(c: &ContactContent) -> RenderNode {
    let mut list = RenderNode::element("ul");
    if let Some(email) = non_empty(&c.email) {
        list = list.child(RenderNode::element("li").child(
            RenderNode::with_text("a", email).attr("href", format!("mailto:{email}")),
        ));
    }
    if let Some(phone) = non_empty(&c.phone) {
        list = list.child(RenderNode::element("li").child(
            RenderNode::with_text("a", phone).attr("href", format!("tel:{phone}")),
        ));
    }
    if let Some(address) = non_empty(&c.address) {
        list = list.child(RenderNode::element("li").child(RenderNode::with_text("address", address)));
    }
    RenderNode::element("div")
        .attr("class", "contact")
        .child(RenderNode::with_text("h2", &c.title))
        .child(list)
}

fn button(label: &str, link: &str) -> RenderNode {
    RenderNode::with_text("a", label)
        .attr("class", "button")
        .attr("href", link)
}
