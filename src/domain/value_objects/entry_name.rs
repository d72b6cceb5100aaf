/// Archive entry name split into the record basename and the field it feeds.
///
/// `train/0001.jpg` becomes basename `train/0001` and field `jpg`. Only the
/// final path element is inspected for the extension, so `v1.2/data` has no
/// extension and maps to field `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryName {
    basename: String,
    field: String,
}

impl EntryName {
    pub fn parse(path: &str) -> Self {
        let file_start = path.rfind('/').map_or(0, |i| i + 1);
        match path[file_start..].rfind('.') {
            Some(dot) => {
                let dot = file_start + dot;
                Self {
                    basename: path[..dot].to_string(),
                    field: path[dot + 1..].to_string(),
                }
            }
            None => Self {
                basename: path.to_string(),
                field: String::new(),
            },
        }
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn into_parts(self) -> (String, String) {
        (self.basename, self.field)
    }
}

impl std::fmt::Display for EntryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.basename, self.field)
    }
}
