/* $TEMPORIZE$SOURCE-HASH:d49283bfd2aa0d5f932cbf6a6a180eae15dc8b93ad1b60ea2eb1ef40f06c93cc */
// 由 temporize 从 模板目录 生成，请勿手动修改。

pub mod page;
pub mod parts;

pub use self::page::Page;
