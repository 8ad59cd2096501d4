/* $TEMPORIZE$SOURCE-HASH:7657387fbd2b081c01456b25a614b2b69c68e474758c54b6c18c7a7a3c2186e6 */
// 由 temporize 从 模板目录 parts/ 生成，请勿手动修改。

pub mod nav;

pub use self::nav::Nav;
