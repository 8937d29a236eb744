pub mod drain;
pub mod handle;
pub mod keywords;
pub mod orchestrator;
pub mod partition;
pub mod progress;
pub mod recover;

use crate::{
    config::AppConfig, gateway::ModelGateway, library::PhotoBackend,
    processors::scratch::ScratchDir,
};

/// Everything an item needs on its way through the pipeline.
pub struct Pipeline<'a> {
    pub backend: &'a dyn PhotoBackend,
    pub gateway: &'a dyn ModelGateway,
    pub scratch: &'a ScratchDir,
    pub config: &'a AppConfig,
}

#[cfg(test)]
pub(crate) mod testing {
    use anyhow::{Result, bail};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::{cell::RefCell, io::Cursor};

    use crate::{config::Language, gateway::ModelGateway, library::memory::ExportArtifact};

    /// Gateway answering from a fixed reply, recording what it was asked.
    pub struct ScriptedGateway {
        pub reply: String,
        pub translation: String,
        pub fail_describe: bool,
        pub described: RefCell<usize>,
        pub translated: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedGateway {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                translation: String::new(),
                fail_describe: false,
                described: RefCell::new(0),
                translated: RefCell::new(Vec::new()),
            }
        }
    }

    impl ModelGateway for ScriptedGateway {
        fn describe_image(&self, jpeg_base64: &str) -> Result<String> {
            *self.described.borrow_mut() += 1;
            if self.fail_describe {
                bail!("model is offline");
            }
            assert!(!jpeg_base64.is_empty());
            Ok(self.reply.clone())
        }

        fn translate_keywords(&self, keywords: &[String], _language: Language) -> Result<String> {
            self.translated.borrow_mut().push(keywords.to_vec());
            Ok(self.translation.clone())
        }
    }

    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200, 120, 40])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    pub fn still(name: &str) -> Vec<ExportArtifact> {
        vec![ExportArtifact::new(name, png_bytes(64, 32))]
    }
}
