/* $TEMPORIZE$SOURCE-HASH:630069db68c5e90607e47a0be9e94adf9d4c5256c53a28f83acbb88718623ff0 */
// 由 temporize 从 parts/Nav.temporize.html 生成，请勿手动修改。
#![allow(non_snake_case, non_camel_case_types)]

#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub slug: ::std::string::String,
    pub label: ::std::string::String,
}

impl Nav {
    pub fn new() -> Self {
        <Self as ::std::default::Default>::default()
    }

    pub fn with_slug(mut self, value: impl ::std::convert::Into<::std::string::String>) -> Self {
        self.slug = value.into();
        self
    }

    pub fn with_label(mut self, value: impl ::std::convert::Into<::std::string::String>) -> Self {
        self.label = value.into();
        self
    }
}

impl ::temporize::runtime::Template for Nav {
    fn render(&self, w: &mut dyn ::std::fmt::Write) -> ::std::fmt::Result {
        w.write_str("<nav><a href=\"/")?;
        w.write_str(&::temporize::runtime::modifiers::urlenc(&self.slug))?;
        w.write_str("\">")?;
        w.write_str(&self.label)?;
        w.write_str("</a></nav>\n")?;
        ::std::result::Result::Ok(())
    }
}

impl ::std::fmt::Display for Nav {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        ::temporize::runtime::Template::render(self, f)
    }
}
