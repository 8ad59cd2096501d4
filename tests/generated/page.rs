/* $TEMPORIZE$SOURCE-HASH:b51b3aa8ace84b700b8da0c8715fbbf23f017cca269ab42e61bfb1b0a29f867f */
// 由 temporize 从 Page.temporize.html 生成，请勿手动修改。
#![allow(non_snake_case, non_camel_case_types)]

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub title: ::std::string::String,
    pub note: ::std::string::String,
    pub temporize: ::std::vec::Vec<temporize::Temporize>,
    pub nav: ::std::option::Option<::std::boxed::Box<crate::templates::parts::Nav>>,
    pub inner: ::std::option::Option<::std::boxed::Box<crate::templates::Page>>,
}

impl Page {
    pub fn new() -> Self {
        <Self as ::std::default::Default>::default()
    }

    pub fn with_title(mut self, value: impl ::std::convert::Into<::std::string::String>) -> Self {
        self.title = value.into();
        self
    }

    pub fn with_note(mut self, value: impl ::std::convert::Into<::std::string::String>) -> Self {
        self.note = value.into();
        self
    }

    pub fn with_temporize(mut self, value: ::std::vec::Vec<temporize::Temporize>) -> Self {
        self.temporize = value;
        self
    }

    pub fn with_nav(mut self, value: crate::templates::parts::Nav) -> Self {
        self.nav = ::std::option::Option::Some(::std::boxed::Box::new(value));
        self
    }

    pub fn with_inner(mut self, value: crate::templates::Page) -> Self {
        self.inner = ::std::option::Option::Some(::std::boxed::Box::new(value));
        self
    }
}

impl ::temporize::runtime::Template for Page {
    fn render(&self, w: &mut dyn ::std::fmt::Write) -> ::std::fmt::Result {
        w.write_str("<h1>")?;
        w.write_str(&::temporize::runtime::modifiers::def(&self.title))?;
        w.write_str("</h1>\n")?;
        if let ::std::option::Option::Some(unit) = &self.nav {
            ::temporize::runtime::Template::render(&**unit, w)?;
        }
        w.write_str("\n<ul>")?;
        for item in &self.temporize {
            ::temporize::runtime::Template::render(item, w)?;
        }
        w.write_str("</ul>\n")?;
        if !self.note.is_empty() {
            w.write_str("<p class=\"note\">")?;
            w.write_str(&self.note)?;
            w.write_str("</p>")?;
        } else {
            w.write_str("-")?;
        }
        w.write_str("\n")?;
        if let ::std::option::Option::Some(unit) = &self.inner {
            ::temporize::runtime::Template::render(&**unit, w)?;
        }
        w.write_str("\n")?;
        ::std::result::Result::Ok(())
    }
}

impl ::std::fmt::Display for Page {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        ::temporize::runtime::Template::render(self, f)
    }
}

pub mod temporize {
    #[derive(Debug, Clone, Default)]
    pub struct Temporize {
        pub name: ::std::string::String,
        pub active: bool,
    }

    impl Temporize {
        pub fn new() -> Self {
            <Self as ::std::default::Default>::default()
        }

        pub fn with_name(mut self, value: impl ::std::convert::Into<::std::string::String>) -> Self {
            self.name = value.into();
            self
        }

        pub fn with_active(mut self, value: bool) -> Self {
            self.active = value;
            self
        }
    }

    impl ::temporize::runtime::Template for Temporize {
        fn render(&self, w: &mut dyn ::std::fmt::Write) -> ::std::fmt::Result {
            w.write_str("<li>")?;
            w.write_str(&::temporize::runtime::modifiers::upper(&self.name))?;
            if self.active {
                w.write_str(" *")?;
            }
            w.write_str("</li>")?;
            ::std::result::Result::Ok(())
        }
    }

    impl ::std::fmt::Display for Temporize {
        fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
            ::temporize::runtime::Template::render(self, f)
        }
    }
}
