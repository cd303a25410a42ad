use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::embed_migrations;
use gotham::state::{FromState, State};
use gotham_derive::StateData;

use std::panic::AssertUnwindSafe;

pub use diesel::pg::PgConnection as Connection;

embed_migrations!();

/// The database connection pool, shared via gotham's state data
#[derive(StateData)]
pub struct DbConnection {
    // The pool holds locks that aren't unwind safe, gotham requires middleware state to be.
    pool: AssertUnwindSafe<Pool<ConnectionManager<Connection>>>,
}

impl Clone for DbConnection {
    fn clone(&self) -> Self {
        Self {
            pool: AssertUnwindSafe(self.pool.0.clone()),
        }
    }
}

impl DbConnection {
    /// Builds the pool and brings the schema up to date.
    pub fn from_url(url: &str) -> Result<Self, failure::Error> {
        let pool = Pool::builder().build(ConnectionManager::new(url))?;
        let connection = pool.get()?;
        embedded_migrations::run(&*connection)?;
        info!("Database migrations are up to date");
        Ok(Self {
            pool: AssertUnwindSafe(pool),
        })
    }

    pub fn from_state(
        state: &State,
    ) -> Result<PooledConnection<ConnectionManager<Connection>>, failure::Error> {
        Self::borrow_from(state).get()
    }

    pub fn get(&self) -> Result<PooledConnection<ConnectionManager<Connection>>, failure::Error> {
        Ok(self.pool.get()?)
    }
}

/// Opens a connection to the database named by `TEST_DATABASE_URL` with migrations applied.
/// Everything done through it is rolled back when it is dropped.
#[cfg(test)]
pub fn test_connection() -> Connection {
    use diesel::Connection as _;

    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let connection = Connection::establish(&url).expect("failed to connect to test database");
    embedded_migrations::run(&connection).expect("failed to run migrations");
    connection
        .begin_test_transaction()
        .expect("failed to begin test transaction");
    connection
}
