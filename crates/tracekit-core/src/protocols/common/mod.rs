pub(crate) mod reader;

pub(crate) use reader::FieldReader;
