pub mod modifiers;

use std::fmt;

/// 生成的模板类型实现的渲染接口
pub trait Template {
    /// 按模板内容依次写出
    fn render(&self, w: &mut dyn fmt::Write) -> fmt::Result;

    fn render_to_string(&self) -> String {
        let mut out = String::new();
        // 写入 String 不会失败
        let _ = self.render(&mut out);
        out
    }
}
