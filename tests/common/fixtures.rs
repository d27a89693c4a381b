//! A small library catalogue used by the object-building tests.
use std::sync::Arc;
use xmldigest::actions::{CallAction, CreateAction, LinkAction, ParamAction};
use xmldigest::{Action, Digester, DigestError, ParseError, TypeRegistry, new_object};

pub const CATALOGUE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<library name="City Library">
    <!-- two books -->
    <book isbn="978-0141439518">
        <title>Pride and Prejudice</title>
        <author>Jane Austen</author>
        <year>1813</year>
    </book>
    <book isbn="978-0486280615">
        <title>The Adventures of Huckleberry Finn</title>
        <author>Mark Twain</author>
        <year> 1884 </year>
    </book>
</library>
"#;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Library {
    pub name: String,
    pub books: Vec<Book>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub year: Option<u32>,
}

pub fn catalogue_types() -> TypeRegistry {
    let mut types = TypeRegistry::new();
    types
        .register_with("library", |attrs| {
            Ok(new_object(Library {
                name: attrs.get("name").unwrap_or_default().to_string(),
                books: Vec::new(),
            }))
        })
        .register_with("book", |attrs| {
            Ok(new_object(Book {
                isbn: attrs.get("isbn").unwrap_or_default().to_string(),
                ..Book::default()
            }))
        });
    types
}

/// A digester that maps [`CATALOGUE`]-shaped documents onto [`Library`].
pub fn catalogue_digester() -> Result<Digester, DigestError> {
    let mut digester = Digester::new().with_factory(Arc::new(catalogue_types()));
    digester
        .add_rule("/library", Arc::new(CreateAction::new("library")))?
        .add_rules(
            "library/book",
            [
                Arc::new(CreateAction::new("book")) as Arc<dyn Action>,
                Arc::new(LinkAction::<Library, Book, _>::new(|library, book| {
                    library.books.push(book.clone())
                })) as Arc<dyn Action>,
                Arc::new(CallAction::<Book, _>::new(2, |book, params| {
                    book.title = params[0].clone().unwrap_or_default();
                    book.author = params[1].clone().unwrap_or_default();
                    Ok(())
                })) as Arc<dyn Action>,
            ],
        )?
        .add_rule("book/title", Arc::new(ParamAction::from_body(0)))?
        .add_rule("book/author", Arc::new(ParamAction::from_body(1)))?
        .add_rule(
            "book/year",
            Arc::new(CallAction::<Book, _>::new(0, |book, params| {
                let text = params[0].as_deref().unwrap_or_default().trim();
                let year = text
                    .parse::<u32>()
                    .map_err(|e| ParseError::with_source(format!("invalid year '{}'", text), e))?;
                book.year = Some(year);
                Ok(())
            })),
        )?;
    Ok(digester)
}
