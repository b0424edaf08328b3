use std::collections::HashMap;

/// Dictionary body shared by `Dict` and `Stream` objects
pub type Dict = HashMap<String, PdfObject>;

/// Reference to an indirect object (e.g., "5 0 R")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub obj_num: u32,
    pub gen_num: u16,
}

impl ObjRef {
    pub fn new(obj_num: u32, gen_num: u16) -> Self {
        Self { obj_num, gen_num }
    }
}

/// All possible PDF object types
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    String(Vec<u8>),
    Name(String),
    Array(Vec<PdfObject>),
    Dict(Dict),
    Stream { dict: Dict, data: Vec<u8> },
    Ref(ObjRef),
}

impl PdfObject {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PdfObject::Int(n) => Some(*n),
            PdfObject::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric value of an `Int` or `Real`
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PdfObject::Real(f) => Some(*f),
            PdfObject::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<PdfObject>> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            PdfObject::Dict(d) => Some(d),
            PdfObject::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Option<ObjRef> {
        match self {
            PdfObject::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// Look up a key when this object is a dictionary or stream
    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Read an array of numbers, skipping non-numeric entries
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        self.as_array()
            .map(|items| items.iter().filter_map(PdfObject::as_number).collect())
    }
}
