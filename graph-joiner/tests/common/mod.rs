use std::sync::Arc;

use graph_joiner::Schema;
use graph_joiner::json_ext::json;
use graph_joiner::schema::FieldType;
use graph_joiner::schema::JoinType;
use graph_joiner::schema::Relationship;
use graph_joiner::test_harness::MemoryTable;
use graph_joiner::test_harness::Records;
use graph_joiner::test_harness::attribute;

pub struct Library {
    pub schema: Arc<Schema<Records>>,
    pub authors: Arc<MemoryTable>,
    pub books: Arc<MemoryTable>,
}

pub fn authors() -> Arc<MemoryTable> {
    MemoryTable::from_json(
        "Author",
        json!([
            { "id": 1, "name": "PG Wodehouse" },
            { "id": 2, "name": "Joseph Heller" }
        ]),
    )
}

pub fn books() -> Arc<MemoryTable> {
    MemoryTable::from_json(
        "Book",
        json!([
            { "id": 1, "title": "Leave It to Psmith", "author_id": 1, "genre": "comedy" },
            { "id": 2, "title": "Right Ho, Jeeves", "author_id": 1, "genre": "comedy" },
            { "id": 3, "title": "Catch-22", "author_id": 2, "genre": "satire" }
        ]),
    )
}

pub fn library() -> Library {
    library_of(authors(), books())
}

pub fn library_of(authors: Arc<MemoryTable>, books: Arc<MemoryTable>) -> Library {
    let author_books =
        Relationship::many("Book", books.select_joined("id", "author_id")).join("id", "authorId");
    let book_author = Relationship::single("Author", authors.select_joined("author_id", "id"))
        .join("authorId", "id");

    let author = JoinType::new("Author", authors.clone())
        .field("id", attribute(FieldType::Int, "id"))
        .field("name", attribute(FieldType::String, "name"))
        .relationship("bookTitles", author_books.extract("title"))
        .relationship(
            "firstBook",
            Relationship::single("Book", books.select_joined("id", "author_id"))
                .join("id", "authorId"),
        )
        .relationship("books", author_books);

    let book = JoinType::new("Book", books.clone())
        .field("id", attribute(FieldType::Int, "id"))
        .field("title", attribute(FieldType::String, "title"))
        .field("genre", attribute(FieldType::String, "genre"))
        .field("authorId", attribute(FieldType::Int, "author_id"))
        .relationship("booksBySameAuthor", book_author.extract("books"))
        .relationship("author", book_author);

    let root = JoinType::root("Query")
        .relationship(
            "books",
            Relationship::many("Book", books.select_by_argument("genre", "genre"))
                .arg("genre", FieldType::String),
        )
        .relationship(
            "book",
            Relationship::single("Book", books.select_by_argument("id", "id"))
                .arg("id", FieldType::Int),
        )
        .relationship(
            "author",
            Relationship::single("Author", authors.select_by_argument("id", "id"))
                .arg("id", FieldType::Int),
        )
        .relationship("authors", Relationship::many("Author", authors.select_all()));

    let schema = Schema::builder()
        .root(root)
        .join_type(author)
        .join_type(book)
        .build()
        .unwrap();

    Library {
        schema: Arc::new(schema),
        authors,
        books,
    }
}
