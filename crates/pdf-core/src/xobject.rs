//! External objects painted with the `Do` operator

use crate::image::ImageXObject;
use crate::text::format_number;
use lopdf::{Dictionary, Object, Stream};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A self-contained vector drawing
///
/// `content` is a content stream in the form's own coordinate space,
/// clipped to `bbox` and mapped onto the page through `matrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormXObject {
    pub bbox: [f64; 4],
    pub matrix: [f64; 6],
    pub content: Vec<u8>,
}

impl FormXObject {
    /// A form whose content uses a top-left origin with y growing downwards,
    /// as vector graphics formats do
    pub fn top_down(width: f64, height: f64, content: Vec<u8>) -> Self {
        Self {
            bbox: [0.0, 0.0, width, height],
            matrix: [1.0, 0.0, 0.0, -1.0, 0.0, height],
            content,
        }
    }

    pub fn to_pdf_stream(&self) -> Stream {
        let numbers = |values: &[f64]| -> Object {
            Object::Array(values.iter().map(|v| Object::Real(*v as _)).collect())
        };

        let dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Form".to_vec())),
            ("FormType", Object::Integer(1)),
            ("BBox", numbers(&self.bbox)),
            ("Matrix", numbers(&self.matrix)),
            ("Resources", Object::Dictionary(Dictionary::new())),
        ]);

        Stream::new(dict, self.content.clone())
    }
}

/// An image or form that can be placed on any number of pages
#[derive(Debug, Clone)]
pub enum XObject {
    Image(ImageXObject),
    Form(FormXObject),
}

impl XObject {
    /// Content hash used to write identical objects only once
    pub fn key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self {
            XObject::Image(image) => {
                0u8.hash(&mut hasher);
                image.width.hash(&mut hasher);
                image.height.hash(&mut hasher);
                image.color_space.hash(&mut hasher);
                image.data.hash(&mut hasher);
            }
            XObject::Form(form) => {
                1u8.hash(&mut hasher);
                for v in form.bbox.iter().chain(form.matrix.iter()) {
                    format_number(*v).hash(&mut hasher);
                }
                form.content.hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Natural size in user space units
    pub fn size(&self) -> (f64, f64) {
        match self {
            XObject::Image(image) => (image.width as f64, image.height as f64),
            XObject::Form(form) => (form.bbox[2] - form.bbox[0], form.bbox[3] - form.bbox[1]),
        }
    }

    pub fn to_pdf_stream(&self) -> Stream {
        match self {
            XObject::Image(image) => image.to_pdf_stream(),
            XObject::Form(form) => form.to_pdf_stream(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_top_down_form() {
        let form = FormXObject::top_down(40.0, 20.0, b"0 0 m 40 20 l S\n".to_vec());
        assert_eq!(form.bbox, [0.0, 0.0, 40.0, 20.0]);
        assert_eq!(form.matrix, [1.0, 0.0, 0.0, -1.0, 0.0, 20.0]);

        let stream = form.to_pdf_stream();
        assert_eq!(stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        assert_eq!(stream.content, b"0 0 m 40 20 l S\n".to_vec());
    }

    #[test]
    fn test_key_depends_on_content() {
        let a = XObject::Form(FormXObject::top_down(10.0, 10.0, b"a".to_vec()));
        let b = XObject::Form(FormXObject::top_down(10.0, 10.0, b"a".to_vec()));
        let c = XObject::Form(FormXObject::top_down(10.0, 10.0, b"c".to_vec()));
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_size() {
        let form = XObject::Form(FormXObject::top_down(30.0, 15.0, Vec::new()));
        assert_eq!(form.size(), (30.0, 15.0));
    }
}
