//! Users following each other.
use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::{
    error::{Error, Result, Toggle},
    pagination::{PageRequest, Pagination},
    schema::{follows, users},
    user::{self, Actor, Permission, Profile, User},
    Connection,
};

/// A user in a follower listing along with when the follow happened
#[derive(Clone, Debug, Serialize)]
pub struct FollowEntry {
    pub user: Profile,
    pub timestamp: NaiveDateTime,
}

impl From<(User, NaiveDateTime)> for FollowEntry {
    fn from((user, timestamp): (User, NaiveDateTime)) -> Self {
        FollowEntry {
            user: user.into(),
            timestamp,
        }
    }
}

fn check_target(actor: &Actor, target: i32) -> Result<()> {
    actor.require(Permission::Follow)?;
    if actor.id() == target {
        return Err(Error::InvalidOperation("You can't follow yourself"));
    }
    Ok(())
}

/// Starts following `target`. Following someone twice leaves a single follow in place.
pub fn follow(connection: &Connection, actor: &Actor, target: i32) -> Result<Toggle> {
    check_target(actor, target)?;
    user::get(connection, target)?;

    let rows = diesel::insert_into(follows::table)
        .values((
            follows::follower_id.eq(actor.id()),
            follows::followed_id.eq(target),
        ))
        .on_conflict_do_nothing()
        .execute(connection)?;
    let toggle = Toggle::from_affected(rows);
    if toggle.changed() {
        info!("User {} now follows user {}", actor.id(), target);
    }
    Ok(toggle)
}

pub fn unfollow(connection: &Connection, actor: &Actor, target: i32) -> Result<Toggle> {
    check_target(actor, target)?;
    user::get(connection, target)?;

    let rows = diesel::delete(
        follows::table
            .filter(follows::follower_id.eq(actor.id()))
            .filter(follows::followed_id.eq(target)),
    )
    .execute(connection)?;
    let toggle = Toggle::from_affected(rows);
    if toggle.changed() {
        info!("User {} unfollowed user {}", actor.id(), target);
    }
    Ok(toggle)
}

pub fn is_following(connection: &Connection, follower: i32, followed: i32) -> Result<bool> {
    let query = follows::table
        .filter(follows::follower_id.eq(follower))
        .filter(follows::followed_id.eq(followed));
    Ok(diesel::select(diesel::dsl::exists(query)).get_result(connection)?)
}

pub fn follower_count(connection: &Connection, user: i32) -> Result<i64> {
    Ok(follows::table
        .filter(follows::followed_id.eq(user))
        .count()
        .get_result(connection)?)
}

pub fn followed_count(connection: &Connection, user: i32) -> Result<i64> {
    Ok(follows::table
        .filter(follows::follower_id.eq(user))
        .count()
        .get_result(connection)?)
}

/// The users following `user`, most recent first.
pub fn followers(
    connection: &Connection,
    user: i32,
    request: PageRequest,
    per_page: i64,
) -> Result<Pagination<FollowEntry>> {
    let total = follower_count(connection, user)?;
    let page = Pagination::fetch(request, per_page, total, |limit, offset| {
        follows::table
            .inner_join(users::table.on(users::id.eq(follows::follower_id)))
            .filter(follows::followed_id.eq(user))
            .select((users::all_columns, follows::timestamp))
            .order((follows::timestamp.desc(), users::id.asc()))
            .limit(limit)
            .offset(offset)
            .load::<(User, NaiveDateTime)>(connection)
    })?;
    Ok(page.map(FollowEntry::from))
}

/// The users `user` follows, most recent first.
pub fn followed(
    connection: &Connection,
    user: i32,
    request: PageRequest,
    per_page: i64,
) -> Result<Pagination<FollowEntry>> {
    let total = followed_count(connection, user)?;
    let page = Pagination::fetch(request, per_page, total, |limit, offset| {
        follows::table
            .inner_join(users::table.on(users::id.eq(follows::followed_id)))
            .filter(follows::follower_id.eq(user))
            .select((users::all_columns, follows::timestamp))
            .order((follows::timestamp.desc(), users::id.asc()))
            .limit(limit)
            .offset(offset)
            .load::<(User, NaiveDateTime)>(connection)
    })?;
    Ok(page.map(FollowEntry::from))
}

#[cfg(test)]
mod tests {
    use super::check_target;
    use crate::{
        error::{Error, Toggle},
        pagination::PageRequest,
        user::{
            tests::{actor, insert_actor},
            Permission,
        },
    };

    #[test]
    fn rejects_self_follow() {
        let ada = actor(1, &[Permission::Follow]);
        match check_target(&ada, 1) {
            Err(Error::InvalidOperation(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(check_target(&ada, 2).is_ok());
    }

    #[test]
    fn requires_follow_permission() {
        let lurker = actor(1, &[Permission::Comment]);
        match check_target(&lurker, 2) {
            Err(Error::PermissionDenied(Permission::Follow)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    #[ignore]
    fn follow_then_unfollow_restores_count() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        let bob = insert_actor(&connection, "bob");
        let before = super::follower_count(&connection, bob.id()).unwrap();

        assert_eq!(super::follow(&connection, &ada, bob.id()).unwrap(), Toggle::Changed);
        assert_eq!(super::follow(&connection, &ada, bob.id()).unwrap(), Toggle::Unchanged);
        assert!(super::is_following(&connection, ada.id(), bob.id()).unwrap());
        assert_eq!(super::follower_count(&connection, bob.id()).unwrap(), before + 1);

        let followers = super::followers(&connection, bob.id(), PageRequest::Number(1), 30).unwrap();
        assert_eq!(followers.items[0].user.username, "ada");
        let followed = super::followed(&connection, ada.id(), PageRequest::Number(1), 30).unwrap();
        assert_eq!(followed.items[0].user.username, "bob");

        assert_eq!(super::unfollow(&connection, &ada, bob.id()).unwrap(), Toggle::Changed);
        assert_eq!(super::unfollow(&connection, &ada, bob.id()).unwrap(), Toggle::Unchanged);
        assert_eq!(super::follower_count(&connection, bob.id()).unwrap(), before);
    }

    #[test]
    #[ignore]
    fn unknown_target() {
        let connection = crate::db::test_connection();
        let ada = insert_actor(&connection, "ada");
        match super::follow(&connection, &ada, -7) {
            Err(Error::NotFound("user")) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
