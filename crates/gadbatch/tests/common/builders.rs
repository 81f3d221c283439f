//! Builders for parameter files and upload payloads.

#![allow(dead_code)]

use gadbatch::batch::UploadedFile;

/// Builds the text of a GAD parameter file, one value per line.
pub struct ParameterFileBuilder {
    header: [String; 10],
    cross_sections: Vec<(f64, f64)>,
}

impl ParameterFileBuilder {
    /// The reference header: scale1=100 scale2=50 skew=0 datum=100 toprl=105
    /// left=0 right=50 xincr=5 yincr=1 noch=11.
    pub fn new() -> Self {
        let header = ["100", "50", "0", "100", "105", "0", "50", "5", "1", "11"]
            .map(|v| v.to_string());
        Self {
            header,
            cross_sections: vec![],
        }
    }

    pub fn scale1(mut self, value: &str) -> Self {
        self.header[0] = value.to_string();
        self
    }

    pub fn skew(mut self, value: &str) -> Self {
        self.header[2] = value.to_string();
        self
    }

    pub fn noch(mut self, value: &str) -> Self {
        self.header[9] = value.to_string();
        self
    }

    pub fn cross_section(mut self, chainage: f64, level: f64) -> Self {
        self.cross_sections.push((chainage, level));
        self
    }

    pub fn build(&self) -> String {
        let mut lines: Vec<String> = self.header.to_vec();
        for (chainage, level) in &self.cross_sections {
            lines.push(chainage.to_string());
            lines.push(level.to_string());
        }
        lines.join("\n") + "\n"
    }

    pub fn upload(&self, name: &str) -> UploadedFile {
        upload(name, &self.build())
    }
}

pub fn upload(name: &str, content: &str) -> UploadedFile {
    UploadedFile {
        name: name.to_string(),
        content: content.to_string(),
        size: content.len() as u64,
    }
}
