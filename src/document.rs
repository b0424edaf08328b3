use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::content::{ContentParser, FormXObject, Resources};
use crate::decode::decode_stream;
use crate::error::{PdfError, Result};
use crate::extract::Page;
use crate::font::Font;
use crate::parser::{Parser, Token};
use crate::types::{BBox, Dict, Matrix, ObjRef, PdfObject};

/// US Letter, used when no page in the chain carries a /MediaBox
const DEFAULT_MEDIA_BOX: BBox = BBox {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Form XObjects nested deeper than this are not loaded
const MAX_RESOURCE_DEPTH: usize = 8;

/// Where an in-use object lives
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XRefEntry {
    /// Byte offset of `n g obj` in the file
    Offset { offset: usize, generation: u16 },
    /// Index inside the object stream numbered `stream`
    Compressed { stream: u32, index: usize },
}

/// Decoded object stream: object numbers with their offsets relative to `/First`
struct ObjectStream {
    data: Vec<u8>,
    first: usize,
    entries: Vec<(u32, usize)>,
}

/// Leaf of the page tree with its inherited attributes already applied
#[derive(Debug, Clone)]
struct PageNode {
    dict: Dict,
    resources: Option<PdfObject>,
    media_box: BBox,
}

/// Parsed PDF document
pub struct Document<'a> {
    data: &'a [u8],
    /// Object number -> xref entry; free entries are absent
    xref: HashMap<u32, XRefEntry>,
    trailer: Dict,
    cache: HashMap<ObjRef, PdfObject>,
    object_streams: HashMap<u32, Rc<ObjectStream>>,
    /// Object numbers whose load is in progress
    loading: HashSet<u32>,
    fonts: HashMap<ObjRef, Rc<Font>>,
    pages: Vec<PageNode>,
}

impl<'a> Document<'a> {
    /// Parse a PDF document from bytes
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if !data.starts_with(b"%PDF-") {
            return Err(PdfError::MissingHeader);
        }

        let startxref_pos = Self::find_startxref(data)?;
        let xref_offset = Self::parse_startxref(data, startxref_pos)?;
        let (xref, trailer) = Self::load_xref_chain(data, xref_offset)?;
        debug!(objects = xref.len(), "cross-reference loaded");

        let mut doc = Document {
            data,
            xref,
            trailer,
            cache: HashMap::new(),
            object_streams: HashMap::new(),
            loading: HashSet::new(),
            fonts: HashMap::new(),
            pages: Vec::new(),
        };
        doc.pages = doc.collect_pages()?;

        Ok(doc)
    }

    /// Find "startxref" by searching backwards from EOF
    fn find_startxref(data: &[u8]) -> Result<usize> {
        let search = b"startxref";
        let search_region = data.len().saturating_sub(1024); // Last 1KB

        (search_region..=data.len().saturating_sub(search.len()))
            .rev()
            .find(|&i| data[i..].starts_with(search))
            .ok_or(PdfError::MissingEof)
    }

    /// Parse the xref offset after "startxref"
    fn parse_startxref(data: &[u8], pos: usize) -> Result<usize> {
        let mut parser = Parser::new(data);
        parser.seek(pos + b"startxref".len());

        match parser.next_token()? {
            Some(Token::Int(offset)) if offset >= 0 => Ok(offset as usize),
            _ => Err(PdfError::Parse {
                position: pos,
                message: "Expected xref offset after startxref".into(),
            }),
        }
    }

    /// Walk the `/Prev` chain from the newest section; the first entry seen for an object wins
    fn load_xref_chain(data: &[u8], start: usize) -> Result<(HashMap<u32, XRefEntry>, Dict)> {
        let mut merged: HashMap<u32, Option<XRefEntry>> = HashMap::new();
        let mut trailer: Option<Dict> = None;
        let mut visited = HashSet::new();
        let mut next = Some(start);

        while let Some(offset) = next {
            if !visited.insert(offset) {
                warn!(offset, "xref /Prev chain loops, stopping");
                break;
            }

            let (entries, dict) = Self::parse_xref_section(data, offset)?;

            // Hybrid files list compressed objects in /XRefStm and mark them free in the table
            if let Some(stm) = dict.get("XRefStm").and_then(PdfObject::as_int) {
                let (stm_entries, _) = Self::parse_xref_section(data, stm.max(0) as usize)?;
                for (num, entry) in stm_entries {
                    merged.entry(num).or_insert(entry);
                }
            }
            for (num, entry) in entries {
                merged.entry(num).or_insert(entry);
            }

            next = dict
                .get("Prev")
                .and_then(PdfObject::as_int)
                .map(|p| p.max(0) as usize);
            if trailer.is_none() {
                trailer = Some(dict);
            }
        }

        let trailer = trailer.ok_or_else(|| PdfError::InvalidXref("no trailer".into()))?;
        let xref = merged
            .into_iter()
            .filter_map(|(num, entry)| entry.map(|e| (num, e)))
            .collect();
        Ok((xref, trailer))
    }

    /// Parse one xref section (table or stream); `None` marks a free entry
    fn parse_xref_section(
        data: &[u8],
        offset: usize,
    ) -> Result<(Vec<(u32, Option<XRefEntry>)>, Dict)> {
        if offset >= data.len() {
            return Err(PdfError::InvalidXref(format!(
                "offset {} beyond end of file",
                offset
            )));
        }

        let mut parser = Parser::new(data);
        parser.seek(offset);
        match parser.next_token()? {
            Some(Token::XRef) => Self::parse_xref_table(&mut parser),
            Some(Token::Int(_)) => {
                parser.seek(offset);
                Self::parse_xref_stream(&mut parser)
            }
            other => Err(PdfError::InvalidXref(format!(
                "expected xref at {}, got {:?}",
                offset, other
            ))),
        }
    }

    /// Classic table: subsections of `start count` followed by `offset gen n|f` entries
    fn parse_xref_table(parser: &mut Parser) -> Result<(Vec<(u32, Option<XRefEntry>)>, Dict)> {
        let mut entries = Vec::new();

        loop {
            let start = match parser.next_token()? {
                Some(Token::Trailer) => break,
                Some(Token::Int(start)) if start >= 0 => start as u32,
                other => {
                    return Err(PdfError::InvalidXref(format!(
                        "expected subsection header, got {:?}",
                        other
                    )));
                }
            };
            let count = match parser.next_token()? {
                Some(Token::Int(count)) if count >= 0 => count as u32,
                other => {
                    return Err(PdfError::InvalidXref(format!(
                        "expected subsection count, got {:?}",
                        other
                    )));
                }
            };

            for i in 0..count {
                let num = start.checked_add(i).ok_or_else(|| {
                    PdfError::InvalidXref(format!("subsection {} + {} overflows", start, count))
                })?;
                let fields = (parser.next_token()?, parser.next_token()?, parser.next_token()?);
                let entry = match fields {
                    (Some(Token::Int(offset)), Some(Token::Int(generation)), Some(Token::Keyword(flag))) => {
                        match flag.as_str() {
                            "n" => Some(XRefEntry::Offset {
                                offset: offset.max(0) as usize,
                                generation: generation.clamp(0, u16::MAX as i64) as u16,
                            }),
                            "f" => None,
                            _ => {
                                return Err(PdfError::InvalidXref(format!(
                                    "bad entry flag {:?}",
                                    flag
                                )));
                            }
                        }
                    }
                    other => {
                        return Err(PdfError::InvalidXref(format!(
                            "malformed entry {:?}",
                            other
                        )));
                    }
                };
                entries.push((num, entry));
            }
        }

        match parser.parse_object()? {
            Some(PdfObject::Dict(dict)) => Ok((entries, dict)),
            _ => Err(PdfError::InvalidStructure(
                "Trailer must be dictionary".into(),
            )),
        }
    }

    /// Cross-reference stream (PDF 1.5): binary rows described by `/W` over `/Index` ranges
    fn parse_xref_stream(parser: &mut Parser) -> Result<(Vec<(u32, Option<XRefEntry>)>, Dict)> {
        let (_, obj) = parser.parse_indirect_object()?;
        let PdfObject::Stream { dict, data } = obj else {
            return Err(PdfError::InvalidXref("xref offset does not point to a stream".into()));
        };

        let widths: Vec<usize> = dict
            .get("W")
            .and_then(PdfObject::as_numbers)
            .map(|w| w.iter().map(|v| v.max(0.0) as usize).collect())
            .filter(|w: &Vec<usize>| w.len() == 3)
            .ok_or_else(|| PdfError::InvalidXref("xref stream needs a three-entry /W".into()))?;
        let row_len: usize = widths.iter().sum();
        if row_len == 0 {
            return Err(PdfError::InvalidXref("xref stream /W is all zero".into()));
        }

        let size = dict.get("Size").and_then(PdfObject::as_int).unwrap_or(0);
        let index = dict
            .get("Index")
            .and_then(PdfObject::as_numbers)
            .unwrap_or_else(|| vec![0.0, size as f64]);

        let decoded = decode_stream(&dict, &data)?;
        let mut rows = decoded.chunks_exact(row_len);
        let mut entries = Vec::new();

        for range in index.chunks_exact(2) {
            let (start, count) = (range[0].max(0.0) as u32, range[1].max(0.0) as u32);
            for i in 0..count {
                let num = start.checked_add(i).ok_or_else(|| {
                    PdfError::InvalidXref(format!("/Index range {} + {} overflows", start, count))
                })?;
                let Some(row) = rows.next() else {
                    warn!(object = num, "xref stream shorter than its /Index");
                    return Ok((entries, dict));
                };

                let (f1, rest) = row.split_at(widths[0]);
                let (f2, f3) = rest.split_at(widths[1]);
                // A zero-width type field defaults to 1
                let kind = if widths[0] == 0 { 1 } else { be_uint(f1) };
                let entry = match kind {
                    0 => None,
                    1 => Some(XRefEntry::Offset {
                        offset: be_uint(f2) as usize,
                        generation: be_uint(f3) as u16,
                    }),
                    2 => Some(XRefEntry::Compressed {
                        stream: be_uint(f2) as u32,
                        index: be_uint(f3) as usize,
                    }),
                    // Unknown types are treated as null references
                    _ => None,
                };
                entries.push((num, entry));
            }
        }

        Ok((entries, dict))
    }

    /// Get the trailer dictionary
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Get number of objects in xref
    pub fn object_count(&self) -> usize {
        self.xref.len()
    }

    /// Resolve an object reference
    pub fn resolve(&mut self, obj_ref: ObjRef) -> Result<&PdfObject> {
        if !self.cache.contains_key(&obj_ref) {
            if !self.loading.insert(obj_ref.obj_num) {
                return Err(PdfError::InvalidStructure(format!(
                    "object {} is needed to load itself",
                    obj_ref.obj_num
                )));
            }
            let loaded = self.load_object(obj_ref);
            self.loading.remove(&obj_ref.obj_num);
            self.cache.insert(obj_ref, loaded?);
        }

        self.cache
            .get(&obj_ref)
            .ok_or(PdfError::ObjectNotFound(obj_ref.obj_num, obj_ref.gen_num))
    }

    fn load_object(&mut self, obj_ref: ObjRef) -> Result<PdfObject> {
        let entry = self
            .xref
            .get(&obj_ref.obj_num)
            .copied()
            .ok_or(PdfError::ObjectNotFound(obj_ref.obj_num, obj_ref.gen_num))?;

        match entry {
            XRefEntry::Offset { offset, .. } => {
                let mut parser = Parser::new(self.data);
                parser.seek(offset);
                let (found, obj) = parser.parse_indirect_object()?;
                if found.obj_num != obj_ref.obj_num {
                    return Err(PdfError::Parse {
                        position: offset,
                        message: format!(
                            "Expected object {}, found {}",
                            obj_ref.obj_num, found.obj_num
                        ),
                    });
                }
                Ok(obj)
            }
            XRefEntry::Compressed { stream, index } => {
                let objstm = self.object_stream(stream)?;
                let (num, offset) = objstm.entries.get(index).copied().ok_or_else(|| {
                    PdfError::InvalidStructure(format!(
                        "object stream {} has no index {}",
                        stream, index
                    ))
                })?;
                if num != obj_ref.obj_num {
                    warn!(expected = obj_ref.obj_num, found = num, "object stream index mismatch");
                }

                let mut parser = Parser::new(&objstm.data);
                parser.seek(objstm.first + offset);
                parser
                    .parse_object()?
                    .ok_or(PdfError::ObjectNotFound(obj_ref.obj_num, obj_ref.gen_num))
            }
        }
    }

    fn object_stream(&mut self, num: u32) -> Result<Rc<ObjectStream>> {
        if let Some(objstm) = self.object_streams.get(&num) {
            return Ok(Rc::clone(objstm));
        }

        let stream = self.resolve(ObjRef::new(num, 0))?.clone();
        let PdfObject::Stream { dict, data } = stream else {
            return Err(PdfError::InvalidStructure(format!(
                "object {} is not an object stream",
                num
            )));
        };

        let n = dict.get("N").and_then(PdfObject::as_int).unwrap_or(0).max(0);
        let first = dict.get("First").and_then(PdfObject::as_int).unwrap_or(0).max(0) as usize;
        let data = decode_stream(&dict, &data)?;

        let mut entries = Vec::new();
        let mut parser = Parser::new(&data);
        for _ in 0..n {
            match (parser.next_token()?, parser.next_token()?) {
                (Some(Token::Int(obj)), Some(Token::Int(offset))) => {
                    entries.push((obj.max(0) as u32, offset.max(0) as usize));
                }
                other => {
                    return Err(PdfError::InvalidStructure(format!(
                        "bad object stream header in {}: {:?}",
                        num, other
                    )));
                }
            }
        }

        let objstm = Rc::new(ObjectStream {
            data,
            first,
            entries,
        });
        self.object_streams.insert(num, Rc::clone(&objstm));
        Ok(objstm)
    }

    /// Get an object, resolving references automatically
    pub fn get_object(&mut self, obj: &PdfObject) -> Result<PdfObject> {
        match obj {
            PdfObject::Ref(r) => self.resolve(*r).cloned(),
            other => Ok(other.clone()),
        }
    }

    /// Decoded data of a stream given directly or by reference
    pub fn decoded_stream(&mut self, obj: &PdfObject) -> Result<Vec<u8>> {
        match self.get_object(obj)? {
            PdfObject::Stream { dict, data } => decode_stream(&dict, &data),
            _ => Err(PdfError::InvalidStructure("Expected stream object".into())),
        }
    }

    /// Get document catalog
    pub fn catalog(&mut self) -> Result<PdfObject> {
        let root = self
            .trailer
            .get("Root")
            .cloned()
            .ok_or_else(|| PdfError::InvalidStructure("Missing Root in trailer".into()))?;

        self.get_object(&root)
    }

    /// Number of leaves in the page tree
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn collect_pages(&mut self) -> Result<Vec<PageNode>> {
        let catalog = self.catalog()?;
        let root = catalog
            .get("Pages")
            .cloned()
            .ok_or_else(|| PdfError::InvalidStructure("Missing Pages in catalog".into()))?;

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.walk_page_tree(&root, None, None, &mut visited, &mut pages)?;
        Ok(pages)
    }

    fn walk_page_tree(
        &mut self,
        node: &PdfObject,
        resources: Option<&PdfObject>,
        media_box: Option<&PdfObject>,
        visited: &mut HashSet<ObjRef>,
        pages: &mut Vec<PageNode>,
    ) -> Result<()> {
        if let Some(r) = node.as_ref() {
            if !visited.insert(r) {
                warn!(object = r.obj_num, "page tree cycle, node skipped");
                return Ok(());
            }
        }

        let obj = self.get_object(node)?;
        let Some(dict) = obj.as_dict() else {
            warn!("page tree node is not a dictionary");
            return Ok(());
        };

        let resources = dict.get("Resources").or(resources);
        let media_box = dict.get("MediaBox").or(media_box);

        let is_leaf = match dict.get("Type").and_then(PdfObject::as_name) {
            Some("Pages") => false,
            Some(_) => true,
            None => !dict.contains_key("Kids"),
        };

        if is_leaf {
            let media_box = match media_box {
                Some(mb) => self
                    .get_object(mb)?
                    .as_numbers()
                    .filter(|n| n.len() == 4)
                    .map(|n| BBox::new(n[0], n[1], n[2], n[3]))
                    .unwrap_or(DEFAULT_MEDIA_BOX),
                None => DEFAULT_MEDIA_BOX,
            };
            pages.push(PageNode {
                dict: dict.clone(),
                resources: resources.cloned(),
                media_box,
            });
            return Ok(());
        }

        let kids = match dict.get("Kids") {
            Some(kids) => self.get_object(kids)?,
            None => PdfObject::Array(Vec::new()),
        };
        for kid in kids.as_array().map(Vec::as_slice).unwrap_or_default() {
            self.walk_page_tree(kid, resources, media_box, visited, pages)?;
        }

        Ok(())
    }

    /// Interpret page `index` (0-based) into characters, spans and ruling edges
    pub fn page(&mut self, index: usize) -> Result<Page> {
        let node = self
            .pages
            .get(index)
            .cloned()
            .ok_or_else(|| PdfError::InvalidStructure(format!("Page {} not found", index)))?;

        let resources = match &node.resources {
            Some(res) => match self.get_object(res)? {
                PdfObject::Dict(dict) => self.load_resources(&dict, 0)?,
                _ => Resources::default(),
            },
            None => Resources::default(),
        };

        let contents = self.page_contents(&node.dict)?;
        let content = ContentParser::new().parse(&contents, &resources)?;
        debug!(
            page = index + 1,
            chars = content.chars.len(),
            edges = content.edges.len(),
            "page interpreted"
        );

        Ok(Page::new(index + 1, node.media_box, content))
    }

    /// Concatenated content stream(s) of a page; a page without /Contents is blank
    fn page_contents(&mut self, page: &Dict) -> Result<Vec<u8>> {
        let Some(contents) = page.get("Contents") else {
            return Ok(Vec::new());
        };

        match self.get_object(contents)? {
            PdfObject::Array(parts) => {
                let mut result = Vec::new();
                for part in &parts {
                    result.extend(self.decoded_stream(part)?);
                    result.push(b'\n'); // Separate streams
                }
                Ok(result)
            }
            stream @ PdfObject::Stream { .. } => self.decoded_stream(&stream),
            PdfObject::Null => Ok(Vec::new()),
            _ => Err(PdfError::InvalidStructure("Invalid Contents type".into())),
        }
    }

    fn load_resources(&mut self, res: &Dict, depth: usize) -> Result<Resources> {
        let mut resources = Resources::default();

        if let Some(fonts) = res.get("Font") {
            if let PdfObject::Dict(fonts) = self.get_object(fonts)? {
                for (name, entry) in &fonts {
                    match self.load_font(entry) {
                        Ok(font) => {
                            resources.fonts.insert(name.clone(), font);
                        }
                        Err(e) => warn!(font = %name, error = %e, "font could not be loaded"),
                    }
                }
            }
        }

        if let Some(xobjects) = res.get("XObject") {
            if let PdfObject::Dict(xobjects) = self.get_object(xobjects)? {
                for (name, entry) in &xobjects {
                    if let Some(form) = self.load_form(entry, &resources, depth)? {
                        resources.forms.insert(name.clone(), Rc::new(form));
                    }
                }
            }
        }

        Ok(resources)
    }

    fn load_font(&mut self, entry: &PdfObject) -> Result<Rc<Font>> {
        if let Some(cached) = entry.as_ref().and_then(|r| self.fonts.get(&r)) {
            return Ok(Rc::clone(cached));
        }

        let dict = match self.get_object(entry)? {
            PdfObject::Dict(dict) => dict,
            _ => return Err(PdfError::InvalidStructure("Font must be dictionary".into())),
        };
        let font = Rc::new(Font::load(self, &dict)?);

        if let Some(r) = entry.as_ref() {
            self.fonts.insert(r, Rc::clone(&font));
        }
        Ok(font)
    }

    /// Load a form XObject; images and other XObject kinds yield `None`
    fn load_form(
        &mut self,
        entry: &PdfObject,
        parent: &Resources,
        depth: usize,
    ) -> Result<Option<FormXObject>> {
        if depth >= MAX_RESOURCE_DEPTH {
            warn!(depth, "form XObject nesting too deep, not loaded");
            return Ok(None);
        }

        let PdfObject::Stream { dict, data } = self.get_object(entry)? else {
            return Ok(None);
        };
        if dict.get("Subtype").and_then(PdfObject::as_name) != Some("Form") {
            return Ok(None);
        }

        let content = decode_stream(&dict, &data)?;
        let matrix = match dict.get("Matrix") {
            Some(m) => self
                .get_object(m)?
                .as_numbers()
                .and_then(|n| Matrix::from_slice(&n))
                .unwrap_or_default(),
            None => Matrix::IDENTITY,
        };

        // Forms without their own /Resources see the parent's fonts
        let resources = match dict.get("Resources") {
            Some(res) => match self.get_object(res)? {
                PdfObject::Dict(res) => self.load_resources(&res, depth + 1)?,
                _ => Resources::default(),
            },
            None => Resources {
                fonts: parent.fonts.clone(),
                forms: HashMap::new(),
            },
        };

        Ok(Some(FormXObject {
            content,
            matrix,
            resources,
        }))
    }
}

/// Big-endian unsigned field of an xref stream row
fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
